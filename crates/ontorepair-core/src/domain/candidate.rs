//! Versioned ontology candidates.

use serde::{Deserialize, Serialize};

use super::digest::ContentDigest;

/// Immutable snapshot of serialized ontology text at one generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OntologyCandidate {
    generation: u32,
    text: String,
    digest: ContentDigest,
    /// Generation whose report drove the repair that produced this candidate.
    source_report: Option<u32>,
}

impl OntologyCandidate {
    /// The initial draft (generation 0).
    pub fn draft(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            generation: 0,
            digest: ContentDigest::from_bytes(text.as_bytes()),
            text,
            source_report: None,
        }
    }

    /// Successor candidate produced by repairing `self`.
    pub fn successor(&self, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            generation: self.generation + 1,
            digest: ContentDigest::from_bytes(text.as_bytes()),
            text,
            source_report: Some(self.generation),
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    pub fn source_report(&self) -> Option<u32> {
        self.source_report
    }

    /// Whether `text` carries no change relative to this candidate.
    ///
    /// Surrounding whitespace is ignored; any other difference counts as progress.
    pub fn is_unchanged_by(&self, text: &str) -> bool {
        self.text.trim() == text.trim()
    }
}
