//! Normalized checker diagnostics.

use serde::{Deserialize, Serialize};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Fatal,
}

/// What class of problem a diagnostic describes.
///
/// Variant order is the repair priority order: syntax first, then the two
/// consistency kinds, then pitfalls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    SyntaxError,
    InconsistentClass,
    UnsatisfiableClass,
    Pitfall,
}

impl DiagnosticKind {
    /// Severity every diagnostic of this kind carries.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::Pitfall => Severity::Warning,
            _ => Severity::Fatal,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => "syntax_error",
            DiagnosticKind::InconsistentClass => "inconsistent_class",
            DiagnosticKind::UnsatisfiableClass => "unsatisfiable_class",
            DiagnosticKind::Pitfall => "pitfall",
        }
    }
}

/// A single finding from one checker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,

    /// Always `kind.severity()`; stored so serialized reports are self-describing.
    pub severity: Severity,

    /// Human-readable message.
    pub message: String,

    /// Implicated entity (IRI) or axiom, if any.
    pub entity: Option<String>,

    /// Rule or tool code (e.g. "pitfall::missing_label").
    pub code: Option<String>,

    /// Line number in the candidate text (1-indexed).
    pub line: Option<u32>,

    /// Column number (1-indexed).
    pub column: Option<u32>,

    /// Checkers or reasoners that reported this finding.
    pub sources: Vec<String>,
}

impl Diagnostic {
    /// Create a new diagnostic; severity follows from the kind.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            entity: None,
            code: None,
            line: None,
            column: None,
            sources: Vec::new(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::SyntaxError, message)
    }

    pub fn unsatisfiable(class_iri: impl Into<String>) -> Self {
        let class_iri = class_iri.into();
        Self::new(
            DiagnosticKind::UnsatisfiableClass,
            format!("class {class_iri} is unsatisfiable (equivalent to owl:Nothing)"),
        )
        .with_entity(class_iri)
    }

    /// One diagnostic for a globally inconsistent ontology.
    pub fn inconsistent(detail: Option<&str>) -> Self {
        let message = match detail {
            Some(detail) if !detail.trim().is_empty() => {
                format!("ontology is inconsistent: {}", detail.trim())
            }
            _ => "ontology is inconsistent: no model satisfies its axioms".to_string(),
        };
        Self::new(DiagnosticKind::InconsistentClass, message)
    }

    pub fn pitfall(code: &str, entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Pitfall, message)
            .with_entity(entity)
            .with_code(code)
    }

    /// Set implicated entity.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set diagnostic code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set source location.
    pub fn with_location(mut self, line: u32, column: Option<u32>) -> Self {
        self.line = Some(line);
        self.column = column;
        self
    }

    /// Record a reporting source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }

    /// Deduplication key shared by findings from different reasoners.
    pub fn dedup_key(&self) -> (DiagnosticKind, Option<String>) {
        (self.kind, self.entity.clone())
    }
}
