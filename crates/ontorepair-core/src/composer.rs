//! Turns a validation report into a repair prompt.
//!
//! Diagnostics are grouped by kind and rendered in a fixed priority order
//! (syntax, consistency, pitfalls). The candidate text is embedded verbatim
//! so the backend edits in place. Output depends only on the inputs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::{Diagnostic, DiagnosticKind, ValidationReport};
use crate::graph::local_name;

pub const TURTLE_START_MARKER: &str = "###start_turtle###";
pub const TURTLE_END_MARKER: &str = "###end_turtle###";

/// System persona sent with every repair request.
pub const SYSTEM_PROMPT: &str = "You are an expert ontology engineer who writes OWL ontologies in Turtle.\n\
Respond ONLY with the complete corrected ontology between ###start_turtle### and ###end_turtle### markers.\n\
Avoid explanations or text outside these markers.";

const CONTEXT_LINES: usize = 2;
const MAX_EVIDENCE_LINES_PER_ENTITY: usize = 8;

/// One kind group of the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSection {
    pub kind: DiagnosticKind,
    pub title: String,
    /// Required correction category.
    pub instruction: String,
    pub entities: Vec<String>,
    pub findings: Vec<String>,
    /// Numbered candidate lines relevant to the findings.
    pub evidence: Vec<String>,
}

/// A complete repair request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairPrompt {
    pub system: String,
    pub sections: Vec<PromptSection>,
    pub candidate: String,
}

impl RepairPrompt {
    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    /// Render the user message.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(
            "The ontology below failed validation. Fix every problem listed, editing the \
             ontology in place. Keep all other axioms, prefixes and annotations unchanged.\n\n",
        );

        for (i, section) in self.sections.iter().enumerate() {
            out.push_str(&format!(
                "## {}. {} ({})\n",
                i + 1,
                section.title,
                section.findings.len()
            ));
            out.push_str(&format!("Correction: {}\n", section.instruction));
            if !section.entities.is_empty() {
                out.push_str(&format!("Entities: {}\n", section.entities.join(", ")));
            }
            for finding in &section.findings {
                out.push_str(&format!("- {finding}\n"));
            }
            if !section.evidence.is_empty() {
                out.push_str("Relevant lines:\n");
                for line in &section.evidence {
                    out.push_str(&format!("    {line}\n"));
                }
            }
            out.push('\n');
        }

        out.push_str("## Current ontology\n");
        out.push_str(TURTLE_START_MARKER);
        out.push('\n');
        out.push_str(&self.candidate);
        if !self.candidate.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(TURTLE_END_MARKER);
        out.push_str("\n\nReturn the complete corrected ontology between ");
        out.push_str(TURTLE_START_MARKER);
        out.push_str(" and ");
        out.push_str(TURTLE_END_MARKER);
        out.push_str(".\n");
        out
    }
}

/// Builds repair prompts from reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticComposer;

impl DiagnosticComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose(&self, report: &ValidationReport, candidate_text: &str) -> RepairPrompt {
        let mut groups: BTreeMap<DiagnosticKind, Vec<&Diagnostic>> = BTreeMap::new();
        for diag in report.diagnostics() {
            groups.entry(diag.kind).or_default().push(diag);
        }

        let lines: Vec<&str> = candidate_text.lines().collect();
        let sections = groups
            .into_iter()
            .map(|(kind, diags)| section_for(kind, &diags, &lines))
            .collect();

        RepairPrompt {
            system: SYSTEM_PROMPT.to_string(),
            sections,
            candidate: candidate_text.to_string(),
        }
    }
}

fn section_for(kind: DiagnosticKind, diags: &[&Diagnostic], lines: &[&str]) -> PromptSection {
    let (title, instruction) = match kind {
        DiagnosticKind::SyntaxError => (
            "Syntax errors",
            "make the document valid Turtle (prefix declarations, statement terminators, \
             quoting and IRI brackets) without changing what it models",
        ),
        DiagnosticKind::InconsistentClass => (
            "Global inconsistency",
            "remove or weaken the contradictory axioms so that the ontology has at least one model",
        ),
        DiagnosticKind::UnsatisfiableClass => (
            "Unsatisfiable classes",
            "revise the axioms forcing these classes to be empty (conflicting disjointness, \
             domain/range or cardinality restrictions) so every listed class can have instances",
        ),
        DiagnosticKind::Pitfall => (
            "Modeling pitfalls",
            "improve modeling quality: add missing labels, break subclass cycles, declare \
             disjointness between sibling classes and connect orphan classes",
        ),
    };

    let mut entities: Vec<String> = Vec::new();
    for diag in diags {
        if let Some(entity) = &diag.entity {
            if !entities.contains(entity) {
                entities.push(entity.clone());
            }
        }
    }

    let findings = diags.iter().map(|d| render_finding(d)).collect();

    let mut evidence_lines: BTreeSet<usize> = BTreeSet::new();
    for diag in diags {
        match (kind, diag.line) {
            (DiagnosticKind::SyntaxError, Some(line)) => {
                let line = line as usize;
                let start = line.saturating_sub(CONTEXT_LINES).max(1);
                let end = (line + CONTEXT_LINES).min(lines.len());
                evidence_lines.extend(start..=end);
            }
            _ => {
                if let Some(entity) = &diag.entity {
                    evidence_lines.extend(lines_mentioning(lines, entity));
                }
            }
        }
    }
    let evidence = evidence_lines
        .into_iter()
        .filter_map(|n| lines.get(n - 1).map(|text| format!("{n:>4} | {text}")))
        .collect();

    PromptSection {
        kind,
        title: title.to_string(),
        instruction: instruction.to_string(),
        entities,
        findings,
        evidence,
    }
}

fn render_finding(diag: &Diagnostic) -> String {
    let mut out = String::new();
    if let Some(code) = &diag.code {
        out.push_str(&format!("[{code}] "));
    }
    out.push_str(&diag.message);
    match (diag.line, diag.column) {
        (Some(line), Some(column)) => out.push_str(&format!(" (line {line}, column {column})")),
        (Some(line), None) => out.push_str(&format!(" (line {line})")),
        _ => {}
    }
    out
}

/// 1-indexed numbers of lines naming `entity` by full IRI or prefixed local name.
fn lines_mentioning(lines: &[&str], entity: &str) -> Vec<usize> {
    let full = format!("<{entity}>");
    let local = local_name(entity);
    let prefixed = regex::Regex::new(&format!(
        r"(^|[\s;,(\[])[A-Za-z0-9_\-]*:{}($|[\s;,.)\]])",
        regex::escape(local)
    ))
    .ok();

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| {
            line.contains(&full) || prefixed.as_ref().is_some_and(|re| re.is_match(line))
        })
        .map(|(i, _)| i + 1)
        .take(MAX_EVIDENCE_LINES_PER_ENTITY)
        .collect()
}
