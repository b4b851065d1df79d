//! Turtle well-formedness check.

use crate::domain::{CheckerKind, Diagnostic, ValidationReport};
use crate::graph::{OntologyGraph, ParsedOntology};

/// Outcome of a syntax check: the report, plus the parsed ontology when valid.
#[derive(Debug, Clone)]
pub struct SyntaxCheck {
    pub report: ValidationReport,
    pub parsed: Option<ParsedOntology>,
}

/// Parses candidate text as Turtle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxChecker;

impl SyntaxChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn kind(&self) -> CheckerKind {
        CheckerKind::Syntax
    }

    /// Parse `text`. A failure yields exactly one fatal `SyntaxError`.
    pub fn check(&self, text: &str) -> SyntaxCheck {
        match OntologyGraph::parse_turtle(text) {
            Ok(graph) => SyntaxCheck {
                report: ValidationReport::new(CheckerKind::Syntax),
                parsed: Some(ParsedOntology::new(text, graph)),
            },
            Err(failure) => {
                let mut diagnostic = Diagnostic::syntax(failure.message)
                    .with_code("syntax::turtle")
                    .with_source(CheckerKind::Syntax.name());
                if let Some(line) = failure.line {
                    diagnostic = diagnostic.with_location(line, failure.column);
                }
                SyntaxCheck {
                    report: ValidationReport::with_diagnostics(
                        CheckerKind::Syntax,
                        vec![diagnostic],
                    ),
                    parsed: None,
                }
            }
        }
    }
}
