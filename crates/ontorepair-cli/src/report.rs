//! Human and JSON renderings of reports and loop runs.

use std::path::{Path, PathBuf};

use ontorepair_core::{
    Diagnostic, LoopOutcome, LoopState, Severity, TerminationReason, ValidationReport,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct GenerationSummary {
    pub generation: u32,
    pub fatal: usize,
    pub warnings: usize,
    pub trusted: bool,
    pub reasoners_failed: Vec<String>,
}

/// What a finished loop run produced.
#[derive(Debug, Serialize)]
pub struct RepairSummary {
    pub run_id: String,
    pub outcome: Option<LoopOutcome>,
    pub termination: Option<TerminationReason>,
    pub iterations: u32,
    pub max_iterations: u32,
    pub generations: Vec<GenerationSummary>,
    pub remaining: Vec<Diagnostic>,
    pub pitfalls: Vec<Diagnostic>,
    pub output: Option<PathBuf>,
    pub artifact: Option<PathBuf>,
}

impl RepairSummary {
    pub fn new(state: &LoopState, output: Option<PathBuf>, artifact: Option<PathBuf>) -> Self {
        let generations = state
            .history()
            .iter()
            .map(|report| GenerationSummary {
                generation: report.generation(),
                fatal: report.fatal_count(),
                warnings: report.diagnostics().len() - report.fatal_count(),
                trusted: report.is_trusted(),
                reasoners_failed: report.reasoners_failed().to_vec(),
            })
            .collect();
        let remaining = state
            .history()
            .latest()
            .map(|report| report.fatal().cloned().collect())
            .unwrap_or_default();

        Self {
            run_id: state.run_id().to_string(),
            outcome: state.outcome(),
            termination: state.termination().cloned(),
            iterations: state.iterations(),
            max_iterations: state.config().max_iterations,
            generations,
            remaining,
            pitfalls: state.pitfalls(),
            output,
            artifact,
        }
    }
}

pub fn print_report(file: &Path, report: &ValidationReport) {
    let status = if report.is_valid() { "✓ VALID" } else { "✗ INVALID" };
    println!("{:?}: {}", file, status);
    if !report.reasoners_consulted().is_empty() {
        println!("Reasoners: {}", report.reasoners_consulted().join(", "));
    }
    if !report.reasoners_failed().is_empty() {
        println!("Reasoners failed: {}", report.reasoners_failed().join(", "));
    }
    if !report.is_trusted() {
        println!("Warning: no reasoner produced a verdict; consistency is unknown");
    }
    if report.diagnostics().is_empty() {
        return;
    }
    println!();
    for diagnostic in report.diagnostics() {
        println!("  {}", format_diagnostic(diagnostic));
    }
    println!();
    println!(
        "Summary: {} fatal, {} warning(s)",
        report.fatal_count(),
        report.diagnostics().len() - report.fatal_count()
    );
}

pub fn print_summary(summary: &RepairSummary) {
    let outcome = summary.outcome.map(|o| o.name()).unwrap_or("unknown");
    let status = if summary.outcome == Some(LoopOutcome::Success) { "✓" } else { "✗" };

    println!("Run ID: {}", summary.run_id);
    println!("Outcome: {} {}", status, outcome);
    if let Some(reason) = &summary.termination {
        println!("Reason: {}", describe_termination(reason));
    }
    println!(
        "Iterations: {}/{}",
        summary.iterations, summary.max_iterations
    );
    println!();

    for generation in &summary.generations {
        let trust = if generation.trusted { "" } else { " (no reasoner verdict)" };
        println!(
            "  gen {:>3}: {} fatal, {} warning(s){}",
            generation.generation, generation.fatal, generation.warnings, trust
        );
    }

    if !summary.remaining.is_empty() {
        println!();
        println!("Unresolved:");
        for diagnostic in &summary.remaining {
            println!("  {}", format_diagnostic(diagnostic));
        }
    }
    if !summary.pitfalls.is_empty() {
        println!();
        println!("Pitfalls:");
        for diagnostic in &summary.pitfalls {
            println!("  {}", format_diagnostic(diagnostic));
        }
    }
    if let Some(path) = &summary.output {
        println!();
        println!("Wrote repaired ontology to {:?}", path);
    }
    if let Some(path) = &summary.artifact {
        println!("Loop artifact: {:?}", path);
    }
}

fn describe_termination(reason: &TerminationReason) -> String {
    match reason {
        TerminationReason::NoFatalDiagnostics => "no fatal diagnostics".to_string(),
        TerminationReason::IterationBudgetExhausted => "iteration budget exhausted".to_string(),
        TerminationReason::EmptyRepair => "backend returned an empty ontology".to_string(),
        TerminationReason::UnchangedRepair => "backend returned the ontology unchanged".to_string(),
        TerminationReason::BackendFailure { message } => format!("backend failure: {message}"),
        TerminationReason::NoReasonerVerdict => "no reasoner produced a verdict".to_string(),
        TerminationReason::Cancelled => "cancelled".to_string(),
    }
}

fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        Severity::Fatal => "FATAL",
        Severity::Warning => "warn ",
    };
    let mut line = format!("[{}] {}: {}", severity, diagnostic.kind.name(), diagnostic.message);
    if let Some(at) = diagnostic.line {
        line.push_str(&format!(" (line {at})"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_diagnostic() {
        let diagnostic = Diagnostic::syntax("expected '.'").with_location(3, Some(7));
        let text = format_diagnostic(&diagnostic);
        assert!(text.starts_with("[FATAL] "));
        assert!(text.ends_with("(line 3)"));
    }

    #[test]
    fn test_describe_backend_failure() {
        let reason = TerminationReason::BackendFailure {
            message: "HTTP 401".to_string(),
        };
        assert_eq!(describe_termination(&reason), "backend failure: HTTP 401");
    }
}
