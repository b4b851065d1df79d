//! Repair requests against a generative backend.
//!
//! Each request is bounded by a timeout. Transient failures (network,
//! rate limit, timeout) are retried with exponential backoff; content
//! failures are returned immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::composer::{RepairPrompt, TURTLE_END_MARKER, TURTLE_START_MARKER};
use crate::domain::{BackendError, LoopConfig, RepairError};
use crate::metrics::{Counter, METRICS};
use crate::obs;
use crate::orchestrator::CancelToken;

/// A text-completion service.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Send one prompt and return the raw reply text.
    async fn complete(&self, prompt: &RepairPrompt) -> Result<String, BackendError>;
}

/// Timeout and retry bounds for one repair request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wall-clock limit for a single attempt (milliseconds).
    pub timeout_ms: u64,
    /// Retries after the first attempt (0 = run once).
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries (milliseconds).
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&LoopConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LoopConfig) -> Self {
        Self {
            timeout_ms: config.backend_timeout_secs.saturating_mul(1_000),
            max_retries: config.max_repair_retries,
            backoff_base_ms: config.retry_backoff_ms,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-based).
    ///
    /// Never longer than one attempt's timeout, whatever the backend asks for.
    pub fn delay_after(&self, attempt: u32, error: &BackendError) -> Duration {
        let ms = match error {
            BackendError::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => {
                let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
                self.backoff_base_ms.saturating_mul(factor)
            }
        };
        Duration::from_millis(ms.min(self.timeout_ms))
    }
}

/// Sends repair prompts and reduces replies to candidate Turtle text.
#[derive(Clone)]
pub struct RepairRequester {
    backend: Arc<dyn GenerativeBackend>,
    policy: RetryPolicy,
}

impl RepairRequester {
    pub fn new(backend: Arc<dyn GenerativeBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Request a repaired candidate for `prompt`.
    pub async fn request(&self, prompt: &RepairPrompt) -> Result<String, RepairError> {
        self.request_with_cancel(prompt, &CancelToken::new()).await
    }

    /// Like [`request`](Self::request), but gives up while backing off once
    /// `cancel` fires. An attempt already in flight is allowed to finish.
    pub async fn request_with_cancel(
        &self,
        prompt: &RepairPrompt,
        cancel: &CancelToken,
    ) -> Result<String, RepairError> {
        let max_attempts = self.policy.max_retries + 1;
        let timeout = Duration::from_millis(self.policy.timeout_ms);

        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(timeout, self.backend.complete(prompt)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(BackendError::Timeout(timeout)),
            };

            let err = match result {
                Ok(reply) => {
                    debug!(attempt = attempt, reply_len = reply.len(), "backend replied");
                    return Ok(extract_turtle(&reply));
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(RepairError::Rejected(err));
            }
            if attempt >= max_attempts {
                return Err(RepairError::RetriesExhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.policy.delay_after(attempt, &err);
            METRICS.inc(Counter::BackendRetries);
            obs::emit_backend_retry(attempt, delay.as_millis() as u64, &err);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    debug!(attempt = attempt, "backoff interrupted by cancellation");
                    return Err(RepairError::Cancelled);
                }
            }
            attempt += 1;
        }
    }
}

/// Reduce a model reply to Turtle.
///
/// Marker-delimited blocks win, then a fenced code block, then the whole
/// reply. The result is trimmed and may be empty.
pub fn extract_turtle(reply: &str) -> String {
    let marked = regex::Regex::new(&format!(
        r"(?s){}(.*?){}",
        regex::escape(TURTLE_START_MARKER),
        regex::escape(TURTLE_END_MARKER)
    ))
    .ok();
    if let Some(re) = marked {
        let captured: Vec<&str> = re
            .captures_iter(reply)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .collect();
        if !captured.is_empty() {
            // Empty marker blocks mean an empty answer, not a missing one.
            let blocks: Vec<&str> = captured.into_iter().filter(|b| !b.is_empty()).collect();
            return blocks.join("\n\n");
        }
    }

    let fenced = regex::Regex::new(r"(?s)```(?:turtle|ttl)?[ \t]*\r?\n(.*?)```").ok();
    if let Some(block) = fenced
        .as_ref()
        .and_then(|re| re.captures(reply))
        .and_then(|c| c.get(1))
    {
        let block = block.as_str().trim();
        if !block.is_empty() {
            return block.to_string();
        }
    }

    reply.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::DiagnosticComposer;
    use crate::domain::{CheckerKind, Diagnostic, ValidationReport};
    use crate::fakes::ScriptedBackend;

    fn prompt() -> RepairPrompt {
        let report = ValidationReport::with_diagnostics(
            CheckerKind::Syntax,
            vec![Diagnostic::syntax("expected '.'")],
        );
        DiagnosticComposer::new().compose(&report, "ex:A a owl:Class")
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            timeout_ms: 1_000,
            max_retries,
            backoff_base_ms: 10,
        }
    }

    #[test]
    fn test_extract_marked_block() {
        let reply = "Sure!\n###start_turtle###\nex:A a owl:Class .\n###end_turtle###\nDone.";
        assert_eq!(extract_turtle(reply), "ex:A a owl:Class .");
    }

    #[test]
    fn test_extract_fenced_block() {
        let reply = "Here you go:\n```turtle\nex:A a owl:Class .\n```\n";
        assert_eq!(extract_turtle(reply), "ex:A a owl:Class .");
    }

    #[test]
    fn test_extract_falls_back_to_whole_reply() {
        assert_eq!(extract_turtle("  ex:A a owl:Class .\n"), "ex:A a owl:Class .");
        assert_eq!(extract_turtle("###start_turtle###\n###end_turtle###"), "");
    }

    #[test]
    fn test_backoff_doubles() {
        let p = policy(3);
        let err = BackendError::Transient("reset".into());
        assert_eq!(p.delay_after(1, &err), Duration::from_millis(10));
        assert_eq!(p.delay_after(2, &err), Duration::from_millis(20));
        assert_eq!(p.delay_after(3, &err), Duration::from_millis(40));
        assert_eq!(
            p.delay_after(1, &BackendError::RateLimited { retry_after_ms: 500 }),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_delay_is_capped_by_attempt_timeout() {
        let p = RetryPolicy {
            timeout_ms: 60_000,
            max_retries: 2,
            backoff_base_ms: 1_000,
        };
        let day = BackendError::RateLimited {
            retry_after_ms: 86_400_000,
        };
        assert_eq!(p.delay_after(1, &day), Duration::from_secs(60));
        let err = BackendError::Transient("reset".into());
        assert_eq!(p.delay_after(40, &err), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_retry_after_does_not_stall_the_request() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::RateLimited {
                retry_after_ms: 86_400_000,
            }),
            Ok("ex:A a owl:Class .".into()),
        ]));
        let requester = RepairRequester::new(backend.clone(), policy(1));

        let started = tokio::time::Instant::now();
        let text = requester.request(&prompt()).await.expect("repair");
        assert_eq!(text, "ex:A a owl:Class .");
        assert!(started.elapsed() <= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::RateLimited {
                retry_after_ms: 30_000,
            }),
            Ok("ex:A a owl:Class .".into()),
        ]));
        let requester = RepairRequester::new(
            backend.clone(),
            RetryPolicy {
                timeout_ms: 60_000,
                max_retries: 2,
                backoff_base_ms: 10,
            },
        );
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let err = requester
            .request_with_cancel(&prompt(), &cancel)
            .await
            .expect_err("cancelled");
        assert_eq!(err, RepairError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::Transient("connection reset".into())),
            Err(BackendError::RateLimited { retry_after_ms: 2_000 }),
            Ok("###start_turtle###ex:A a owl:Class .###end_turtle###".into()),
        ]));
        let requester = RepairRequester::new(backend.clone(), policy(3));

        let text = requester.request(&prompt()).await.expect("repair");
        assert_eq!(text, "ex:A a owl:Class .");
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_errors_are_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::Content("no choices".into())),
            Ok("ex:A a owl:Class .".into()),
        ]));
        let requester = RepairRequester::new(backend.clone(), policy(3));

        let err = requester.request(&prompt()).await.expect_err("must fail");
        assert!(matches!(err, RepairError::Rejected(BackendError::Content(_))));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_bounded() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::Transient("a".into())),
            Err(BackendError::Transient("b".into())),
            Err(BackendError::Transient("c".into())),
        ]));
        let requester = RepairRequester::new(backend.clone(), policy(1));

        let err = requester.request(&prompt()).await.expect_err("must fail");
        assert!(matches!(err, RepairError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out_and_retries() {
        let backend = Arc::new(
            ScriptedBackend::new(vec![Ok("late".into()), Ok("ex:A a owl:Class .".into())])
                .with_first_delay(Duration::from_secs(30)),
        );
        let requester = RepairRequester::new(backend.clone(), policy(1));

        let text = requester.request(&prompt()).await.expect("second attempt succeeds");
        assert_eq!(text, "ex:A a owl:Class .");
        assert_eq!(backend.calls(), 2);
    }
}
