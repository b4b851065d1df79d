//! Integration tests running shell scripts as reasoners.

use std::sync::Arc;
use std::time::Duration;

use ontorepair_core::fakes::ScriptedBackend;
use ontorepair_core::{
    Checker, ConsistencyChecker, DiagnosticKind, LoopConfig, LoopOutcome, ParsedOntology,
    Reasoner, ReasonerVerdict, ValidationOrchestrator,
};
use ontorepair_reasoner::{ProcessReasoner, ReasonerRegistry, ReasonerSpec};

const BROKEN: &str = "@prefix ex: <http://example.org/> .\n\
@prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
ex:Broken a owl:Class ; rdfs:label \"Broken\" .\n";

const FIXED: &str = "@prefix ex: <http://example.org/> .\n\
@prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
ex:Fixed a owl:Class ; rdfs:label \"Fixed\" .\n";

/// Reports `ex:Broken` unsatisfiable whenever the input mentions it.
fn grep_reasoner(id: &str) -> ReasonerSpec {
    ReasonerSpec::custom(
        id,
        vec![
            "sh".to_string(),
            "-c".to_string(),
            "if grep -q 'ex:Broken' '{input}'; then \
               echo 'unsatisfiable: http://example.org/Broken' >&2; exit 1; \
             fi; exit 0"
                .to_string(),
        ],
        30,
    )
}

#[tokio::test]
async fn test_process_reasoner_reads_staged_input() {
    let reasoner = ProcessReasoner::new(grep_reasoner("grep")).expect("spec");
    let broken = ParsedOntology::parse(BROKEN).expect("parse");
    let fixed = ParsedOntology::parse(FIXED).expect("parse");

    assert_eq!(
        reasoner.reason(&broken).await.expect("verdict"),
        ReasonerVerdict::Consistent {
            unsatisfiable: vec!["http://example.org/Broken".to_string()]
        }
    );
    assert_eq!(
        reasoner.reason(&fixed).await.expect("verdict"),
        ReasonerVerdict::coherent()
    );
}

#[tokio::test]
async fn test_failed_process_is_excluded_from_report() {
    let good: Arc<dyn Reasoner> =
        Arc::new(ProcessReasoner::new(grep_reasoner("grep")).expect("spec"));
    let missing: Arc<dyn Reasoner> = Arc::new(
        ProcessReasoner::new(ReasonerSpec::custom(
            "missing",
            vec!["/no/such/reasoner".to_string(), "{input}".to_string()],
            30,
        ))
        .expect("spec"),
    );
    let checker =
        ConsistencyChecker::new(vec![good, missing], Duration::from_secs(30)).expect("checker");

    let report = checker
        .check(&ParsedOntology::parse(BROKEN).expect("parse"))
        .await;

    assert!(report.is_trusted());
    assert_eq!(report.reasoners_consulted(), ["grep".to_string()]);
    assert_eq!(report.reasoners_failed(), ["missing".to_string()]);
    assert_eq!(report.count(DiagnosticKind::UnsatisfiableClass), 1);
}

#[tokio::test]
async fn test_configured_reasoner_timeout_outlasts_checker_default() {
    let slow: Arc<dyn Reasoner> = Arc::new(
        ProcessReasoner::new(ReasonerSpec::custom(
            "slow",
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "sleep 2; test -f '{input}'".to_string(),
            ],
            10,
        ))
        .expect("spec"),
    );
    let checker = ConsistencyChecker::new(vec![slow], Duration::from_secs(1)).expect("checker");

    let report = checker
        .check(&ParsedOntology::parse(FIXED).expect("parse"))
        .await;

    assert!(report.is_trusted());
    assert_eq!(report.reasoners_consulted(), ["slow".to_string()]);
    assert!(report.reasoners_failed().is_empty());
}

#[tokio::test]
async fn test_loop_repairs_against_process_reasoner() {
    let mut registry = ReasonerRegistry::new();
    registry.insert(grep_reasoner("grep"));
    let config = LoopConfig::default()
        .with_reasoners(["grep"])
        .with_max_iterations(2);
    let reasoners = registry.build(&config.reasoners).expect("reasoners");
    let backend = Arc::new(ScriptedBackend::replying(&[FIXED]));
    let orch = ValidationOrchestrator::new(config, reasoners, backend).expect("config");

    let state = orch.run(BROKEN).await;

    assert_eq!(state.outcome(), Some(LoopOutcome::Success));
    assert_eq!(state.iterations(), 1);
    assert_eq!(
        state.final_candidate().map(|c| c.text()),
        Some(FIXED.trim())
    );
}
