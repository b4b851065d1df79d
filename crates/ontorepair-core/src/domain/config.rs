//! Loop configuration bundle.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Configuration for one validation-and-repair loop run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoopConfig {
    /// Maximum number of repair cycles. Zero means validate only.
    pub max_iterations: u32,

    /// Reasoner identifiers consulted by the consistency check.
    pub reasoners: Vec<String>,

    /// Per-reasoner timeout in seconds.
    pub reasoner_timeout_secs: u64,

    /// Per-request generative backend timeout in seconds.
    pub backend_timeout_secs: u64,

    /// Retries after the first attempt, for transient backend errors only.
    pub max_repair_retries: u32,

    /// Base delay for exponential retry backoff, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            reasoners: vec!["hermit".to_string(), "jfact".to_string()],
            reasoner_timeout_secs: 120,
            backend_timeout_secs: 60,
            max_repair_retries: 3,
            retry_backoff_ms: 1_000,
        }
    }
}

impl LoopConfig {
    pub fn with_reasoners<I, S>(mut self, reasoners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reasoners = reasoners.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_repair_retries(mut self, retries: u32) -> Self {
        self.max_repair_retries = retries;
        self
    }

    pub fn with_retry_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.retry_backoff_ms = backoff_ms;
        self
    }

    pub fn reasoner_timeout(&self) -> Duration {
        Duration::from_secs(self.reasoner_timeout_secs)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// Reject configurations the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reasoners.is_empty() {
            return Err(ConfigError::NoReasoners);
        }
        let mut seen = HashSet::new();
        for id in &self.reasoners {
            if id.trim().is_empty() {
                return Err(ConfigError::Invalid("empty reasoner identifier".to_string()));
            }
            if !seen.insert(id.as_str()) {
                return Err(ConfigError::DuplicateReasoner(id.clone()));
            }
        }
        if self.reasoner_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "reasoner_timeout_secs",
            });
        }
        if self.backend_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "backend_timeout_secs",
            });
        }
        Ok(())
    }
}
