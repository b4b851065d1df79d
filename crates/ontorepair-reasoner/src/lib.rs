//! ontorepair reasoners - external OWL reasoners as processes
//!
//! Provides the `Reasoner` implementation used by the consistency check:
//! - Builtin HermiT and ROBOT command lines plus custom commands
//! - Process execution with a timeout and kill-on-drop
//! - Classification of free-text reasoner output into verdicts

pub mod classify;
pub mod process;
pub mod registry;
pub mod runner;
pub mod spec;

pub use classify::{classify_output, unsatisfiable_classes};
pub use process::ProcessReasoner;
pub use registry::ReasonerRegistry;
pub use runner::ProcessOutput;
pub use spec::{BuiltinReasoner, ReasonerSpec, INPUT_PLACEHOLDER};
