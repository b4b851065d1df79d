//! Domain-level error taxonomy for ontorepair.
//!
//! Only [`ConfigError`] is allowed to abort a loop before it starts. Every
//! other error here is recovered inside the orchestrator and surfaces as a
//! loop outcome or a diagnostic.

use std::time::Duration;

/// Errors detected while validating a loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no reasoners configured")]
    NoReasoners,

    #[error("reasoner configured more than once: {0}")]
    DuplicateReasoner(String),

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("unknown reasoner: {0}")]
    UnknownReasoner(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure of a single reasoner invocation. Excluded from the report, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReasonerError {
    #[error("reasoner {reasoner} timed out after {timeout:?}")]
    Timeout { reasoner: String, timeout: Duration },

    #[error("reasoner {reasoner} could not be started: {message}")]
    Spawn { reasoner: String, message: String },

    #[error("reasoner {reasoner} crashed (exit code {exit_code:?}): {message}")]
    Crashed {
        reasoner: String,
        exit_code: Option<i32>,
        message: String,
    },

    #[error("reasoner {reasoner} produced unrecognised output")]
    Unrecognized { reasoner: String },
}

impl ReasonerError {
    /// Identifier of the reasoner that failed.
    pub fn reasoner(&self) -> &str {
        match self {
            ReasonerError::Timeout { reasoner, .. }
            | ReasonerError::Spawn { reasoner, .. }
            | ReasonerError::Crashed { reasoner, .. }
            | ReasonerError::Unrecognized { reasoner } => reasoner,
        }
    }
}

/// Errors returned by a generative backend for one request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("transient backend error: {0}")]
    Transient(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("backend request timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend content error: {0}")]
    Content(String),
}

impl BackendError {
    /// Whether the request may succeed if sent again unchanged.
    pub fn is_transient(&self) -> bool {
        !matches!(self, BackendError::Content(_))
    }
}

/// Final error of a repair request after the retry budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepairError {
    #[error("backend failed after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: BackendError },

    #[error("backend rejected the request: {0}")]
    Rejected(BackendError),

    #[error("repair request cancelled")]
    Cancelled,
}

/// Errors while persisting or reading loop artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for artifact operations.
pub type Result<T> = std::result::Result<T, ArtifactError>;
