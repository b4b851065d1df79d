//! Chat-completions client implementing `GenerativeBackend`.

use std::time::Duration;

use async_trait::async_trait;
use ontorepair_core::{BackendError, GenerativeBackend, RepairPrompt};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{BackendConfig, BackendConfigError};

/// Wait applied to a 429 without a usable `retry-after` header.
pub const DEFAULT_RETRY_AFTER_MS: u64 = 20_000;

const ERROR_BODY_PREVIEW: usize = 300;

pub struct ChatCompletionsBackend {
    client: Client,
    config: BackendConfig,
}

impl ChatCompletionsBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendConfigError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendConfigError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

#[async_trait]
impl GenerativeBackend for ChatCompletionsBackend {
    async fn complete(&self, prompt: &RepairPrompt) -> Result<String, BackendError> {
        let body = build_request_body(prompt, &self.config.model, self.config.temperature);

        let mut request = self
            .client
            .post(self.config.endpoint())
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.config.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(Duration::from_secs(self.config.timeout_secs))
            } else {
                BackendError::Transient(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000))
                .unwrap_or(DEFAULT_RETRY_AFTER_MS);
            return Err(BackendError::RateLimited { retry_after_ms });
        }

        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transient(e.to_string()))?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| BackendError::Content(format!("invalid JSON response: {e}")))?;
        let content = parse_completion(&data)?;
        debug!(model = %self.config.model, reply_len = content.len(), "completion received");
        Ok(content)
    }
}

/// JSON body for one repair request: the system persona plus the rendered prompt.
pub fn build_request_body(prompt: &RepairPrompt, model: &str, temperature: Option<f32>) -> Value {
    let mut body = json!({
        "model": model,
        "messages": [
            { "role": "system", "content": prompt.system },
            { "role": "user", "content": prompt.render() },
        ],
    });
    if let Some(temperature) = temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

/// Extract the assistant message from a chat-completions response.
pub fn parse_completion(data: &Value) -> Result<String, BackendError> {
    if let Some(message) = data["error"]["message"].as_str() {
        return Err(BackendError::Content(format!("API error: {message}")));
    }
    match data["choices"][0]["message"]["content"].as_str() {
        Some(content) => Ok(content.to_string()),
        None => Err(BackendError::Content(
            "response carries no completion content".to_string(),
        )),
    }
}

/// Map a non-success status: server-side and timeout statuses are worth retrying.
pub fn status_error(status: StatusCode, body: &str) -> BackendError {
    let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
    let message = format!("HTTP {}: {}", status.as_u16(), preview.trim());
    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        BackendError::Transient(message)
    } else {
        BackendError::Content(message)
    }
}
