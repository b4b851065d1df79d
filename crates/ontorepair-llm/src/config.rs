//! Backend configuration loaded from the environment or a config file.

use serde::{Deserialize, Serialize};

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENROUTER_MODEL: &str = "deepseek/deepseek-v3.2-exp";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Which service the backend talks to. All speak the chat-completions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OpenRouter,
    OpenAi,
    Local,
}

/// Connection settings for a chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub provider: Provider,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    pub model: String,
    /// API root; `/chat/completions` is appended.
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl BackendConfig {
    /// Load from environment variables.
    ///
    /// `OPENROUTER_API_KEY` wins over `OPENAI_API_KEY`, which wins over
    /// `LOCAL_LLM_URL`. `ONTOREPAIR_MODEL` overrides the model of any provider.
    pub fn from_env() -> Result<Self, BackendConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BackendConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let model_override = var("ONTOREPAIR_MODEL");

        let config = if let Some(key) = var("OPENROUTER_API_KEY") {
            Self::openrouter(
                &key,
                &model_override
                    .or_else(|| var("OPENROUTER_MODEL"))
                    .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string()),
            )
        } else if let Some(key) = var("OPENAI_API_KEY") {
            let mut config = Self::openai(
                &key,
                &model_override
                    .or_else(|| var("OPENAI_MODEL"))
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            );
            if let Some(url) = var("OPENAI_BASE_URL") {
                config.base_url = url;
            }
            config
        } else if let Some(url) = var("LOCAL_LLM_URL") {
            Self::local(
                &url,
                &model_override
                    .or_else(|| var("LOCAL_LLM_MODEL"))
                    .unwrap_or_else(|| "default".to_string()),
            )
        } else {
            return Err(BackendConfigError::NoProviderConfigured);
        };

        config.validate()?;
        Ok(config)
    }

    pub fn openrouter(api_key: &str, model: &str) -> Self {
        Self {
            provider: Provider::OpenRouter,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: OPENROUTER_BASE_URL.to_string(),
            timeout_secs: 60,
            temperature: None,
        }
    }

    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            provider: Provider::OpenAi,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
            timeout_secs: 60,
            temperature: None,
        }
    }

    pub fn local(url: &str, model: &str) -> Self {
        Self {
            provider: Provider::Local,
            api_key: String::new(),
            model: model.to_string(),
            base_url: url.to_string(),
            timeout_secs: 120,
            temperature: None,
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<(), BackendConfigError> {
        if self.model.trim().is_empty() {
            return Err(BackendConfigError::Invalid("model is empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(BackendConfigError::Invalid(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.provider != Provider::Local && self.api_key.trim().is_empty() {
            return Err(BackendConfigError::Invalid("API key is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(BackendConfigError::Invalid("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendConfigError {
    #[error("no LLM provider configured; set OPENROUTER_API_KEY, OPENAI_API_KEY or LOCAL_LLM_URL")]
    NoProviderConfigured,

    #[error("invalid backend configuration: {0}")]
    Invalid(String),

    #[error("cannot build HTTP client: {0}")]
    Client(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_openrouter_takes_precedence() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("OPENROUTER_API_KEY", "or-key"),
            ("OPENAI_API_KEY", "oa-key"),
        ]))
        .expect("config");
        assert_eq!(config.provider, Provider::OpenRouter);
        assert_eq!(config.model, DEFAULT_OPENROUTER_MODEL);
        assert_eq!(
            config.endpoint(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_model_override_and_custom_base() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "oa-key"),
            ("OPENAI_BASE_URL", "http://proxy.local/v1/"),
            ("ONTOREPAIR_MODEL", "gpt-4.1"),
        ]))
        .expect("config");
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.endpoint(), "http://proxy.local/v1/chat/completions");
    }

    #[test]
    fn test_local_needs_no_key() {
        let config = BackendConfig::from_lookup(lookup(&[("LOCAL_LLM_URL", "http://127.0.0.1:8080/v1")]))
            .expect("config");
        assert_eq!(config.provider, Provider::Local);
        assert!(config.api_key.is_empty());
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_nothing_configured() {
        let err = BackendConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).expect_err("none");
        assert!(matches!(err, BackendConfigError::NoProviderConfigured));
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let json = serde_json::to_string(&BackendConfig::openai("secret", "gpt-4o")).expect("json");
        assert!(!json.contains("secret"));
    }
}
