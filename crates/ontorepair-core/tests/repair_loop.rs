use std::sync::Arc;

use async_trait::async_trait;
use ontorepair_core::fakes::{CountingChecker, ScriptedBackend, ScriptedReasoner};
use ontorepair_core::{
    BackendError, CancelToken, Checker, ConsistencyChecker, DiagnosticKind, GenerativeBackend,
    LoopConfig, LoopOutcome, OntologyCandidate, PitfallDetector, Reasoner, ReasonerVerdict,
    RepairPrompt, TerminationReason, ValidationOrchestrator,
};

const PREFIXES: &str = "@prefix ex: <http://example.org/> .\n\
@prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n";

/// Parses, but Dog is declared disjoint with its own superclass.
fn unsat_body() -> String {
    format!(
        "{PREFIXES}\
ex:Animal a owl:Class ; rdfs:label \"Animal\" .\n\
ex:Dog a owl:Class ; rdfs:label \"Dog\" ; rdfs:subClassOf ex:Animal ; owl:disjointWith ex:Animal .\n\
ex:Cat a owl:Class ; rdfs:label \"Cat\" ; rdfs:subClassOf ex:Animal ; owl:disjointWith ex:Dog .\n\
ex:hasOwner a owl:ObjectProperty .\n"
    )
}

/// Coherent; the only pitfall is the unlabeled property.
fn clean_body() -> String {
    format!(
        "{PREFIXES}\
ex:Animal a owl:Class ; rdfs:label \"Animal\" .\n\
ex:Dog a owl:Class ; rdfs:label \"Dog\" ; rdfs:subClassOf ex:Animal .\n\
ex:Cat a owl:Class ; rdfs:label \"Cat\" ; rdfs:subClassOf ex:Animal ; owl:disjointWith ex:Dog .\n\
ex:hasOwner a owl:ObjectProperty .\n"
    )
}

/// Missing statement terminator after the Animal label.
fn broken_body() -> String {
    format!(
        "{PREFIXES}\
ex:Animal a owl:Class ; rdfs:label \"Animal\"\n\
ex:Dog a owl:Class ; rdfs:label \"Dog\" ; rdfs:subClassOf ex:Animal .\n"
    )
}

fn config(max_iterations: u32) -> LoopConfig {
    LoopConfig::default()
        .with_reasoners(["hermit"])
        .with_max_iterations(max_iterations)
        .with_retry_backoff_ms(1)
}

#[tokio::test]
async fn clean_candidate_succeeds_on_first_pass() {
    let reasoner = Arc::new(ScriptedReasoner::coherent("hermit"));
    let backend = Arc::new(ScriptedBackend::default());
    let orch = ValidationOrchestrator::new(config(5), vec![reasoner.clone()], backend.clone())
        .expect("config");

    let state = orch.run(clean_body()).await;

    assert_eq!(state.outcome(), Some(LoopOutcome::Success));
    assert_eq!(state.iterations(), 0);
    assert_eq!(state.history().len(), 1);
    assert_eq!(reasoner.calls(), 1);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn syntax_failure_skips_downstream_checkers() {
    let reasoner = Arc::new(ScriptedReasoner::coherent("hermit"));
    let reasoners: Vec<Arc<dyn Reasoner>> = vec![reasoner.clone()];
    let consistency = Arc::new(CountingChecker::new(Arc::new(
        ConsistencyChecker::new(reasoners, config(0).reasoner_timeout()).expect("checker"),
    )));
    let pitfalls = Arc::new(CountingChecker::new(Arc::new(PitfallDetector::new())));
    let checkers: Vec<Arc<dyn Checker>> = vec![consistency.clone(), pitfalls.clone()];
    let orch = ValidationOrchestrator::with_checkers(
        config(0),
        checkers,
        Arc::new(ScriptedBackend::default()),
    )
    .expect("config");

    let report = orch.check(&OntologyCandidate::draft(broken_body())).await;

    assert_eq!(report.count(DiagnosticKind::SyntaxError), 1);
    assert_eq!(report.diagnostics().len(), 1);
    assert_eq!(consistency.calls(), 0);
    assert_eq!(pitfalls.calls(), 0);
    assert_eq!(reasoner.calls(), 0);
}

#[tokio::test]
async fn iteration_budget_is_never_exceeded() {
    let reasoner = ScriptedReasoner::unsatisfiable("hermit", &["http://example.org/Dog"]);
    let replies: Vec<String> = (0..10)
        .map(|i| format!("{}ex:Extra{i} a owl:Class .\n", unsat_body()))
        .collect();
    let replies: Vec<&str> = replies.iter().map(String::as_str).collect();
    let backend = Arc::new(ScriptedBackend::replying(&replies));
    let orch =
        ValidationOrchestrator::new(config(2), vec![Arc::new(reasoner)], backend.clone())
            .expect("config");

    let state = orch.run(unsat_body()).await;

    assert_eq!(state.outcome(), Some(LoopOutcome::Exhausted));
    assert_eq!(
        state.termination(),
        Some(&TerminationReason::IterationBudgetExhausted)
    );
    assert_eq!(state.iterations(), 2);
    assert_eq!(state.history().len(), 3);
    assert_eq!(backend.calls(), 2);
    assert!(state.final_candidate().is_none());
}

#[tokio::test]
async fn pitfall_only_report_succeeds_with_pitfalls_attached() {
    let orch = ValidationOrchestrator::new(
        config(3),
        vec![Arc::new(ScriptedReasoner::coherent("hermit"))],
        Arc::new(ScriptedBackend::default()),
    )
    .expect("config");

    let state = orch.run(format!("{PREFIXES}ex:Lonely a owl:Class .\n")).await;

    assert_eq!(state.outcome(), Some(LoopOutcome::Success));
    let pitfalls = state.pitfalls();
    assert_eq!(pitfalls.len(), 2);
    assert!(pitfalls.iter().all(|d| d.kind == DiagnosticKind::Pitfall));
}

#[tokio::test]
async fn unchanged_repair_is_unrecoverable_without_rechecking() {
    let reasoner = Arc::new(ScriptedReasoner::unsatisfiable(
        "hermit",
        &["http://example.org/Dog"],
    ));
    let same = unsat_body();
    let backend = Arc::new(ScriptedBackend::replying(&[same.as_str()]));
    let orch = ValidationOrchestrator::new(config(5), vec![reasoner.clone()], backend.clone())
        .expect("config");

    let state = orch.run(same.clone()).await;

    assert_eq!(state.outcome(), Some(LoopOutcome::Unrecoverable));
    assert_eq!(state.termination(), Some(&TerminationReason::UnchangedRepair));
    assert_eq!(state.history().len(), 1);
    assert_eq!(state.candidates().len(), 1);
    assert_eq!(reasoner.calls(), 1);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn shared_unsat_class_is_reported_once_across_reasoners() {
    let hermit = Arc::new(ScriptedReasoner::unsatisfiable(
        "hermit",
        &["http://example.org/Dog"],
    ));
    let robot = Arc::new(ScriptedReasoner::unsatisfiable(
        "robot",
        &["http://example.org/Dog"],
    ));
    let orch = ValidationOrchestrator::new(
        config(0).with_reasoners(["hermit", "robot"]),
        vec![hermit, robot],
        Arc::new(ScriptedBackend::default()),
    )
    .expect("config");

    let report = orch.check(&OntologyCandidate::draft(unsat_body())).await;

    assert_eq!(report.count(DiagnosticKind::UnsatisfiableClass), 1);
    assert_eq!(report.reasoners_consulted().len(), 2);
}

#[tokio::test]
async fn zero_reasoners_abort_before_the_loop() {
    let result = ValidationOrchestrator::new(
        LoopConfig::default().with_reasoners(Vec::<String>::new()),
        Vec::new(),
        Arc::new(ScriptedBackend::default()),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn transient_backend_errors_recover_within_budget() {
    let reasoner = ScriptedReasoner::coherent("hermit");
    let backend = Arc::new(ScriptedBackend::new(vec![
        Err(BackendError::Transient("connection reset".into())),
        Ok(format!("###start_turtle###\n{}###end_turtle###", clean_body())),
    ]));
    let orch = ValidationOrchestrator::new(config(3), vec![Arc::new(reasoner)], backend.clone())
        .expect("config");

    let state = orch.run(broken_body()).await;

    assert_eq!(state.outcome(), Some(LoopOutcome::Success));
    assert_eq!(state.iterations(), 1);
    assert_eq!(backend.calls(), 2);
}

/// Backend that cancels the loop while answering.
struct CancellingBackend {
    token: CancelToken,
    reply: String,
}

#[async_trait]
impl GenerativeBackend for CancellingBackend {
    async fn complete(&self, _prompt: &RepairPrompt) -> Result<String, BackendError> {
        self.token.cancel();
        Ok(self.reply.clone())
    }
}

#[tokio::test]
async fn cancellation_is_observed_between_iterations() {
    let token = CancelToken::new();
    let backend = Arc::new(CancellingBackend {
        token: token.clone(),
        reply: clean_body(),
    });
    let orch = ValidationOrchestrator::new(
        config(5),
        vec![Arc::new(ScriptedReasoner::coherent("hermit"))],
        backend,
    )
    .expect("config");

    let state = orch.run_with_cancel(broken_body(), &token).await;

    assert_eq!(state.outcome(), Some(LoopOutcome::Cancelled));
    assert_eq!(state.history().len(), 1);
    assert_eq!(state.candidates().len(), 2);
    assert_eq!(state.current().generation(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_a_rate_limit_wait() {
    let clean = clean_body();
    let backend = Arc::new(ScriptedBackend::new(vec![
        Err(BackendError::RateLimited {
            retry_after_ms: 86_400_000,
        }),
        Ok(clean),
    ]));
    let orch = ValidationOrchestrator::new(
        config(5),
        vec![Arc::new(ScriptedReasoner::coherent("hermit"))],
        backend.clone(),
    )
    .expect("config");
    let token = CancelToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let state = orch.run_with_cancel(broken_body(), &token).await;

    assert_eq!(state.outcome(), Some(LoopOutcome::Cancelled));
    assert_eq!(state.termination(), Some(&TerminationReason::Cancelled));
    assert_eq!(backend.calls(), 1);
    assert!(started.elapsed() < std::time::Duration::from_secs(60));
}

#[tokio::test]
async fn syntax_then_unsat_then_pitfall_only_succeeds_after_two_repairs() {
    let reasoner = Arc::new(ScriptedReasoner::scripted(
        "hermit",
        vec![
            Ok(ReasonerVerdict::Consistent {
                unsatisfiable: vec!["http://example.org/Dog".to_string()],
            }),
            Ok(ReasonerVerdict::coherent()),
        ],
    ));
    let unsat = unsat_body();
    let clean = clean_body();
    let backend = Arc::new(ScriptedBackend::replying(&[unsat.as_str(), clean.as_str()]));
    let orch = ValidationOrchestrator::new(config(5), vec![reasoner.clone()], backend.clone())
        .expect("config");

    let state = orch.run(broken_body()).await;

    assert_eq!(state.outcome(), Some(LoopOutcome::Success));
    assert_eq!(state.iterations(), 2);
    assert_eq!(state.history().len(), 3);

    let reports: Vec<_> = state.history().iter().collect();
    assert_eq!(reports[0].fatal_count(), 1);
    assert_eq!(reports[0].count(DiagnosticKind::SyntaxError), 1);
    assert_eq!(reports[1].fatal_count(), 1);
    assert_eq!(reports[1].count(DiagnosticKind::UnsatisfiableClass), 1);
    assert_eq!(reports[2].fatal_count(), 0);
    assert_eq!(reports[2].pitfalls().len(), 1);

    let prompts = backend.prompts();
    assert_eq!(prompts[0].kinds(), vec![DiagnosticKind::SyntaxError]);
    assert_eq!(prompts[1].kinds()[0], DiagnosticKind::UnsatisfiableClass);
    assert!(prompts[1].render().contains(&unsat));

    // syntax-failed generation never reached the reasoner
    assert_eq!(reasoner.calls(), 2);

    let accepted = state.final_candidate().expect("final candidate");
    assert_eq!(accepted.generation(), 2);
    assert_eq!(accepted.source_report(), Some(1));
    assert_eq!(state.pitfalls().len(), 1);
}
