//! Turns raw reasoner output into a verdict.
//!
//! HermiT and ROBOT report their findings as free text on either stream,
//! and ROBOT logs ordinary incoherence at `ERROR` level, so classification
//! looks at the text first and at the exit code last.

use std::collections::BTreeSet;

use ontorepair_core::{ReasonerError, ReasonerVerdict};
use regex::Regex;

use crate::runner::ProcessOutput;

const INCONSISTENT_SIGNALS: &[&str] = &[
    "inconsistentontologyexception",
    "ontology is inconsistent",
    "inconsistent ontology",
];

const OWL_NOTHING: &str = "http://www.w3.org/2002/07/owl#Nothing";

/// Classify one reasoner run.
pub fn classify_output(
    reasoner: &str,
    output: &ProcessOutput,
) -> Result<ReasonerVerdict, ReasonerError> {
    let combined = output.combined();
    let lower = combined.to_lowercase();

    if INCONSISTENT_SIGNALS.iter().any(|s| lower.contains(s)) {
        return Ok(ReasonerVerdict::Inconsistent {
            detail: inconsistency_detail(&combined),
        });
    }

    let unsatisfiable = unsatisfiable_classes(&combined);
    if !unsatisfiable.is_empty() {
        return Ok(ReasonerVerdict::Consistent { unsatisfiable });
    }

    if output.succeeded() || lower.contains("is satisfiable") {
        return Ok(ReasonerVerdict::coherent());
    }

    match output.exit_code {
        Some(_) if !lower.contains("exception") && !lower.contains("error") => {
            Err(ReasonerError::Unrecognized {
                reasoner: reasoner.to_string(),
            })
        }
        exit_code => Err(ReasonerError::Crashed {
            reasoner: reasoner.to_string(),
            exit_code,
            message: last_line(&output.stderr)
                .or_else(|| last_line(&output.stdout))
                .unwrap_or("no output")
                .to_string(),
        }),
    }
}

/// First output line carrying an inconsistency signal.
fn inconsistency_detail(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| {
            let lower = line.to_lowercase();
            INCONSISTENT_SIGNALS.iter().any(|s| lower.contains(s))
        })
        .map(str::to_string)
}

/// Class IRIs reported as unsatisfiable, sorted and deduplicated.
///
/// Recognises ROBOT's `unsatisfiable: <iri>` lines, HermiT's
/// `EquivalentClasses(<iri> owl:Nothing)` axioms and the indented IRI
/// listing HermiT prints under an `owl:Nothing` heading.
pub fn unsatisfiable_classes(text: &str) -> Vec<String> {
    let mut found = BTreeSet::new();

    if let Ok(robot) = Regex::new(r"(?i)unsatisfiable:\s*<?([A-Za-z][A-Za-z0-9+.\-]*:[^\s<>]+)>?") {
        for caps in robot.captures_iter(text) {
            found.insert(caps[1].to_string());
        }
    }

    let bracketed = Regex::new(r"<([^<>\s]+)>").ok();
    if let (Some(bracketed), Ok(axiom)) = (
        bracketed.as_ref(),
        Regex::new(r"(?i)EquivalentClasses\(([^)]*)\)"),
    ) {
        for caps in axiom.captures_iter(text) {
            let body = &caps[1];
            if body.contains("owl:Nothing") || body.contains(OWL_NOTHING) {
                found.extend(
                    bracketed
                        .captures_iter(body)
                        .map(|c| c[1].to_string())
                        .filter(|iri| iri != OWL_NOTHING),
                );
            }
        }
    }

    if let Some(bracketed) = bracketed.as_ref() {
        let mut in_listing = false;
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                in_listing = false;
                continue;
            }
            let indented = line.starts_with(char::is_whitespace);
            if in_listing && indented {
                found.extend(
                    bracketed
                        .captures_iter(trimmed)
                        .map(|c| c[1].to_string())
                        .filter(|iri| iri != OWL_NOTHING),
                );
                continue;
            }
            in_listing = !indented
                && (trimmed.contains("owl:Nothing") || trimmed.contains(OWL_NOTHING))
                && !trimmed.starts_with("EquivalentClasses");
        }
    }

    found.into_iter().collect()
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}
