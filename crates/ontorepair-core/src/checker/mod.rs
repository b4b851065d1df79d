//! Checkers that turn a candidate into a [`ValidationReport`].
//!
//! The syntax checker gates everything else: only the [`ParsedOntology`]
//! it produces can be handed to a downstream [`Checker`].

pub mod consistency;
pub mod pitfall;
pub mod syntax;

use async_trait::async_trait;

use crate::domain::{CheckerKind, ValidationReport};
use crate::graph::ParsedOntology;

pub use consistency::{ConsistencyChecker, Reasoner, ReasonerVerdict};
pub use pitfall::{PitfallDetector, PitfallRule};
pub use syntax::{SyntaxCheck, SyntaxChecker};

/// A checker that runs over a syntactically valid ontology.
///
/// Implementations are stateless and safe to call concurrently for
/// independent candidates.
#[async_trait]
pub trait Checker: Send + Sync {
    fn kind(&self) -> CheckerKind;

    async fn check(&self, ontology: &ParsedOntology) -> ValidationReport;
}
