//! Domain model: candidates, diagnostics, reports, configuration and errors.

pub mod candidate;
pub mod config;
pub mod diagnostic;
pub mod digest;
pub mod error;
pub mod report;

pub use candidate::OntologyCandidate;
pub use config::LoopConfig;
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use digest::ContentDigest;
pub use error::{ArtifactError, BackendError, ConfigError, ReasonerError, RepairError, Result};
pub use report::{CheckerKind, ReportHistory, ReportStatus, ValidationReport};
