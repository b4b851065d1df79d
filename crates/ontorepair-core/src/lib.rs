//! ontorepair core library
//!
//! Validates ontology candidates (syntax, logical consistency, modeling
//! pitfalls) and drives a bounded repair loop against a generative backend.

pub mod artifact;
pub mod checker;
pub mod composer;
pub mod domain;
pub mod fakes;
pub mod graph;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod repair;
pub mod telemetry;

pub use artifact::{read_loop_artifact, write_loop_artifact};
pub use checker::{
    Checker, ConsistencyChecker, PitfallDetector, PitfallRule, Reasoner, ReasonerVerdict,
    SyntaxCheck, SyntaxChecker,
};
pub use composer::{DiagnosticComposer, PromptSection, RepairPrompt, SYSTEM_PROMPT};
pub use domain::{
    ArtifactError, BackendError, CheckerKind, ConfigError, ContentDigest, Diagnostic,
    DiagnosticKind, LoopConfig, OntologyCandidate, ReasonerError, RepairError, ReportHistory,
    ReportStatus, Severity, ValidationReport,
};
pub use graph::{OntologyGraph, ParsedOntology};
pub use metrics::{Counter, MetricsSnapshot, METRICS};
pub use orchestrator::{
    CancelToken, LoopOutcome, LoopPhase, LoopState, TerminationReason, ValidationOrchestrator,
};
pub use repair::{extract_turtle, GenerativeBackend, RepairRequester, RetryPolicy};
pub use telemetry::init_tracing;

/// ontorepair version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
