//! Logical consistency check backed by one or more external reasoners.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Checker;
use crate::domain::{
    CheckerKind, ConfigError, Diagnostic, DiagnosticKind, ReasonerError, ValidationReport,
};
use crate::graph::ParsedOntology;
use crate::metrics::{Counter, METRICS};
use crate::obs;

/// What a reasoner concluded about an ontology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum ReasonerVerdict {
    /// A model exists; the listed classes (IRIs) are unsatisfiable.
    Consistent { unsatisfiable: Vec<String> },
    /// No model satisfies the ontology.
    Inconsistent { detail: Option<String> },
}

impl ReasonerVerdict {
    pub fn coherent() -> Self {
        ReasonerVerdict::Consistent {
            unsatisfiable: Vec::new(),
        }
    }
}

/// An external logical reasoner.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Identifier used in configuration and diagnostics.
    fn id(&self) -> &str;

    /// This reasoner's own time limit. `None` uses the checker default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn reason(&self, ontology: &ParsedOntology) -> Result<ReasonerVerdict, ReasonerError>;
}

/// Runs every configured reasoner and folds their verdicts into one report.
pub struct ConsistencyChecker {
    reasoners: Vec<Arc<dyn Reasoner>>,
    timeout: Duration,
}

impl ConsistencyChecker {
    pub fn new(reasoners: Vec<Arc<dyn Reasoner>>, timeout: Duration) -> Result<Self, ConfigError> {
        if reasoners.is_empty() {
            return Err(ConfigError::NoReasoners);
        }
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                field: "reasoner_timeout_secs",
            });
        }
        Ok(Self { reasoners, timeout })
    }

    pub fn reasoner_ids(&self) -> Vec<&str> {
        self.reasoners.iter().map(|r| r.id()).collect()
    }

    async fn run_one(
        &self,
        reasoner: &Arc<dyn Reasoner>,
        ontology: &ParsedOntology,
    ) -> Result<ReasonerVerdict, ReasonerError> {
        let timeout = reasoner
            .timeout()
            .filter(|t| !t.is_zero())
            .unwrap_or(self.timeout);
        match tokio::time::timeout(timeout, reasoner.reason(ontology)).await {
            Ok(result) => result,
            Err(_) => Err(ReasonerError::Timeout {
                reasoner: reasoner.id().to_string(),
                timeout,
            }),
        }
    }
}

#[async_trait]
impl Checker for ConsistencyChecker {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Consistency
    }

    async fn check(&self, ontology: &ParsedOntology) -> ValidationReport {
        let results = join_all(self.reasoners.iter().map(|r| self.run_one(r, ontology))).await;

        let mut report = ValidationReport::new(CheckerKind::Consistency);
        let mut findings = Vec::new();
        for (reasoner, result) in self.reasoners.iter().zip(results) {
            match result {
                Ok(verdict) => {
                    debug!(reasoner = %reasoner.id(), verdict = ?verdict, "reasoner verdict");
                    report.record_reasoner_verdict(reasoner.id());
                    findings.extend(verdict_diagnostics(reasoner.id(), verdict));
                }
                Err(err) => {
                    METRICS.inc(Counter::ReasonerFailures);
                    obs::emit_reasoner_failed(reasoner.id(), &err);
                    report.record_reasoner_failure(reasoner.id());
                }
            }
        }

        if report.reasoners_consulted().is_empty() {
            report.mark_untrusted();
        }
        report.extend(dedup_diagnostics(findings));
        report
    }
}

fn verdict_diagnostics(reasoner: &str, verdict: ReasonerVerdict) -> Vec<Diagnostic> {
    match verdict {
        ReasonerVerdict::Inconsistent { detail } => {
            vec![Diagnostic::inconsistent(detail.as_deref())
                .with_code("consistency::inconsistent")
                .with_source(reasoner)]
        }
        ReasonerVerdict::Consistent { unsatisfiable } => unsatisfiable
            .into_iter()
            .map(|class| {
                Diagnostic::unsatisfiable(class)
                    .with_code("consistency::unsatisfiable")
                    .with_source(reasoner)
            })
            .collect(),
    }
}

/// Merge findings that share `(kind, entity)`, keeping every reporting source.
///
/// Global inconsistency subsumes per-class unsatisfiability, so class
/// findings are dropped when any reasoner reported an inconsistent ontology.
pub fn dedup_diagnostics(findings: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let inconsistent = findings
        .iter()
        .any(|d| d.kind == DiagnosticKind::InconsistentClass);

    let mut merged: Vec<Diagnostic> = Vec::new();
    let mut index: HashMap<(DiagnosticKind, Option<String>), usize> = HashMap::new();
    for diag in findings {
        if inconsistent && diag.kind == DiagnosticKind::UnsatisfiableClass {
            continue;
        }
        let key = diag.dedup_key();
        match index.get(&key) {
            Some(&i) => {
                let existing = &mut merged[i];
                for source in diag.sources {
                    if !existing.sources.contains(&source) {
                        existing.sources.push(source);
                    }
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(diag);
            }
        }
    }

    merged.sort_by(|a, b| (a.kind, &a.entity).cmp(&(b.kind, &b.entity)));
    merged
}
