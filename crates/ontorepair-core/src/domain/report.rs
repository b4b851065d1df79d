//! Validation reports and the append-only report history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::diagnostic::{Diagnostic, DiagnosticKind};

/// Which checker produced (part of) a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckerKind {
    Syntax,
    Consistency,
    Pitfall,
}

impl CheckerKind {
    pub fn name(&self) -> &'static str {
        match self {
            CheckerKind::Syntax => "syntax",
            CheckerKind::Consistency => "consistency",
            CheckerKind::Pitfall => "pitfall",
        }
    }
}

/// Overall status derived from a report's diagnostics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Valid,
    Invalid,
}

/// Diagnostics from one full pass over the checkers for one candidate.
///
/// `status` is recomputed on every mutation and on deserialization, and is
/// `Valid` iff no diagnostic is fatal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "StoredReport")]
pub struct ValidationReport {
    generation: u32,
    diagnostics: Vec<Diagnostic>,
    status: ReportStatus,
    /// False when the consistency pass ran but no reasoner produced a verdict.
    trusted: bool,
    checkers_run: Vec<CheckerKind>,
    reasoners_consulted: Vec<String>,
    reasoners_failed: Vec<String>,
    checked_at: DateTime<Utc>,
}

/// Serialized form of a report. A stored `status` is ignored.
#[derive(Deserialize)]
struct StoredReport {
    generation: u32,
    diagnostics: Vec<Diagnostic>,
    trusted: bool,
    checkers_run: Vec<CheckerKind>,
    reasoners_consulted: Vec<String>,
    reasoners_failed: Vec<String>,
    checked_at: DateTime<Utc>,
}

impl From<StoredReport> for ValidationReport {
    fn from(stored: StoredReport) -> Self {
        let mut report = Self {
            generation: stored.generation,
            diagnostics: stored.diagnostics,
            status: ReportStatus::Valid,
            trusted: stored.trusted,
            checkers_run: stored.checkers_run,
            reasoners_consulted: stored.reasoners_consulted,
            reasoners_failed: stored.reasoners_failed,
            checked_at: stored.checked_at,
        };
        report.refresh_status();
        report
    }
}

impl ValidationReport {
    /// Empty, valid report produced by `checker`.
    pub fn new(checker: CheckerKind) -> Self {
        Self {
            generation: 0,
            diagnostics: Vec::new(),
            status: ReportStatus::Valid,
            trusted: true,
            checkers_run: vec![checker],
            reasoners_consulted: Vec::new(),
            reasoners_failed: Vec::new(),
            checked_at: Utc::now(),
        }
    }

    pub fn with_diagnostics(checker: CheckerKind, diagnostics: Vec<Diagnostic>) -> Self {
        let mut report = Self::new(checker);
        report.extend(diagnostics);
        report
    }

    /// Stamp the candidate generation this report belongs to.
    pub fn for_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
        self.refresh_status();
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
        self.refresh_status();
    }

    /// Append another checker's report, keeping diagnostic order.
    pub fn merge(&mut self, other: ValidationReport) {
        self.diagnostics.extend(other.diagnostics);
        for checker in other.checkers_run {
            if !self.checkers_run.contains(&checker) {
                self.checkers_run.push(checker);
            }
        }
        self.reasoners_consulted.extend(other.reasoners_consulted);
        self.reasoners_failed.extend(other.reasoners_failed);
        self.trusted &= other.trusted;
        if other.checked_at > self.checked_at {
            self.checked_at = other.checked_at;
        }
        self.refresh_status();
    }

    pub fn record_reasoner_verdict(&mut self, reasoner: impl Into<String>) {
        self.reasoners_consulted.push(reasoner.into());
    }

    pub fn record_reasoner_failure(&mut self, reasoner: impl Into<String>) {
        self.reasoners_failed.push(reasoner.into());
    }

    pub fn mark_untrusted(&mut self) {
        self.trusted = false;
    }

    fn refresh_status(&mut self) {
        self.status = if self.diagnostics.iter().any(Diagnostic::is_fatal) {
            ReportStatus::Invalid
        } else {
            ReportStatus::Valid
        };
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == ReportStatus::Valid
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn checkers_run(&self) -> &[CheckerKind] {
        &self.checkers_run
    }

    pub fn reasoners_consulted(&self) -> &[String] {
        &self.reasoners_consulted
    }

    pub fn reasoners_failed(&self) -> &[String] {
        &self.reasoners_failed
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    pub fn fatal(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_fatal())
    }

    pub fn fatal_count(&self) -> usize {
        self.fatal().count()
    }

    pub fn by_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.by_kind(kind).count()
    }

    /// Non-blocking pitfall warnings.
    pub fn pitfalls(&self) -> Vec<Diagnostic> {
        self.by_kind(DiagnosticKind::Pitfall).cloned().collect()
    }
}

/// Append-only arena of reports, one per checked candidate, indexed by generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportHistory {
    reports: Vec<ValidationReport>,
}

impl ReportHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a report and return its index.
    pub fn append(&mut self, report: ValidationReport) -> usize {
        self.reports.push(report);
        self.reports.len() - 1
    }

    /// Report for the candidate of the given generation.
    pub fn get(&self, generation: u32) -> Option<&ValidationReport> {
        self.reports.iter().find(|r| r.generation() == generation)
    }

    pub fn latest(&self) -> Option<&ValidationReport> {
        self.reports.last()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationReport> {
        self.reports.iter()
    }
}
