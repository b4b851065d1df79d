//! Validation-and-repair loop controller.
//!
//! `Drafted -> Checking -> {Repairing, Succeeded, Failed}`, with
//! `Repairing -> Checking` closing the loop. Termination is guaranteed by
//! the iteration cap and by rejecting empty or unchanged repairs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::checker::{Checker, ConsistencyChecker, PitfallDetector, Reasoner, SyntaxChecker};
use crate::composer::DiagnosticComposer;
use crate::domain::{
    ConfigError, Diagnostic, LoopConfig, OntologyCandidate, RepairError, ReportHistory,
    ValidationReport,
};
use crate::metrics::{Counter, METRICS};
use crate::obs;
use crate::repair::{GenerativeBackend, RepairRequester, RetryPolicy};

/// Loop state machine phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Drafted,
    Checking,
    Repairing,
    Succeeded,
    Failed,
}

/// Terminal outcome of a loop run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoopOutcome {
    Success,
    Exhausted,
    Unrecoverable,
    Cancelled,
}

impl LoopOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            LoopOutcome::Success => "success",
            LoopOutcome::Exhausted => "exhausted",
            LoopOutcome::Unrecoverable => "unrecoverable",
            LoopOutcome::Cancelled => "cancelled",
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum TerminationReason {
    NoFatalDiagnostics,
    IterationBudgetExhausted,
    EmptyRepair,
    UnchangedRepair,
    BackendFailure { message: String },
    NoReasonerVerdict,
    Cancelled,
}

/// Cooperative cancellation handle, checked between loop phases and
/// during retry backoff.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<CancelInner>);

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag is read so a concurrent cancel is not missed.
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Everything one loop run produced. Mutated only by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoopState {
    run_id: String,
    config: LoopConfig,
    current: OntologyCandidate,
    /// Every accepted candidate, generation order; `current` is the last.
    candidates: Vec<OntologyCandidate>,
    iterations: u32,
    history: ReportHistory,
    phase: LoopPhase,
    outcome: Option<LoopOutcome>,
    termination: Option<TerminationReason>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl LoopState {
    fn new(run_id: String, config: LoopConfig, draft: OntologyCandidate) -> Self {
        Self {
            run_id,
            config,
            candidates: vec![draft.clone()],
            current: draft,
            iterations: 0,
            history: ReportHistory::new(),
            phase: LoopPhase::Drafted,
            outcome: None,
            termination: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn advance(&mut self, next: OntologyCandidate) {
        self.candidates.push(next.clone());
        self.current = next;
    }

    fn finish(&mut self, outcome: LoopOutcome, reason: TerminationReason) {
        self.phase = if outcome == LoopOutcome::Success {
            LoopPhase::Succeeded
        } else {
            LoopPhase::Failed
        };
        self.outcome = Some(outcome);
        self.termination = Some(reason);
        self.finished_at = Some(Utc::now());
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<LoopOutcome> {
        self.outcome
    }

    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Number of repair cycles started.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn current(&self) -> &OntologyCandidate {
        &self.current
    }

    pub fn candidates(&self) -> &[OntologyCandidate] {
        &self.candidates
    }

    pub fn history(&self) -> &ReportHistory {
        &self.history
    }

    /// The accepted ontology, only when the loop succeeded.
    pub fn final_candidate(&self) -> Option<&OntologyCandidate> {
        match self.outcome {
            Some(LoopOutcome::Success) => Some(&self.current),
            _ => None,
        }
    }

    /// Pitfall warnings from the latest report.
    pub fn pitfalls(&self) -> Vec<Diagnostic> {
        self.history
            .latest()
            .map(ValidationReport::pitfalls)
            .unwrap_or_default()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

/// Sequences the checkers, composes repair prompts and owns the convergence policy.
pub struct ValidationOrchestrator {
    config: LoopConfig,
    syntax: SyntaxChecker,
    checkers: Vec<Arc<dyn Checker>>,
    composer: DiagnosticComposer,
    requester: RepairRequester,
}

impl ValidationOrchestrator {
    /// Build the standard checker chain over `reasoners`.
    ///
    /// Every identifier in `config.reasoners` must name one of `reasoners`;
    /// reasoners not listed in the configuration are not consulted.
    pub fn new(
        config: LoopConfig,
        reasoners: Vec<Arc<dyn Reasoner>>,
        backend: Arc<dyn GenerativeBackend>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut selected = Vec::with_capacity(config.reasoners.len());
        for id in &config.reasoners {
            let reasoner = reasoners
                .iter()
                .find(|r| r.id() == id)
                .ok_or_else(|| ConfigError::UnknownReasoner(id.clone()))?;
            selected.push(reasoner.clone());
        }

        let consistency = ConsistencyChecker::new(selected, config.reasoner_timeout())?;
        let checkers: Vec<Arc<dyn Checker>> =
            vec![Arc::new(consistency), Arc::new(PitfallDetector::new())];
        Self::with_checkers(config, checkers, backend)
    }

    /// Build with an explicit set of downstream checkers.
    pub fn with_checkers(
        config: LoopConfig,
        checkers: Vec<Arc<dyn Checker>>,
        backend: Arc<dyn GenerativeBackend>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let requester = RepairRequester::new(backend, RetryPolicy::from_config(&config));
        Ok(Self {
            config,
            syntax: SyntaxChecker::new(),
            checkers,
            composer: DiagnosticComposer::new(),
            requester,
        })
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// One checking pass over `candidate`.
    ///
    /// Downstream checkers run concurrently and only if the syntax check passed.
    pub async fn check(&self, candidate: &OntologyCandidate) -> ValidationReport {
        METRICS.inc(Counter::ChecksRun);
        let syntax = self.syntax.check(candidate.text());
        let mut report = syntax.report;
        if let Some(parsed) = syntax.parsed {
            let reports = join_all(self.checkers.iter().map(|c| c.check(&parsed))).await;
            for downstream in reports {
                report.merge(downstream);
            }
        } else {
            debug!(
                generation = candidate.generation(),
                "syntax failed; downstream checks skipped"
            );
        }
        report.for_generation(candidate.generation())
    }

    pub async fn run(&self, draft: impl Into<String>) -> LoopState {
        self.run_with_cancel(draft, &CancelToken::new()).await
    }

    /// Run the loop to a terminal state. Never fails: every recoverable
    /// condition becomes an outcome on the returned state.
    pub async fn run_with_cancel(
        &self,
        draft: impl Into<String>,
        cancel: &CancelToken,
    ) -> LoopState {
        let state = LoopState::new(
            Uuid::new_v4().to_string(),
            self.config.clone(),
            OntologyCandidate::draft(draft),
        );
        let span = obs::loop_span(&state.run_id);
        self.drive(state, cancel).instrument(span).await
    }

    async fn drive(&self, mut state: LoopState, cancel: &CancelToken) -> LoopState {
        let started = Instant::now();
        obs::emit_loop_started(&state.run_id, self.config.max_iterations, &self.config.reasoners);

        state.phase = LoopPhase::Checking;
        while !state.is_terminal() {
            match state.phase {
                LoopPhase::Checking => self.checking(&mut state, cancel).await,
                LoopPhase::Repairing => self.repairing(&mut state, cancel).await,
                LoopPhase::Drafted | LoopPhase::Succeeded | LoopPhase::Failed => break,
            }
        }

        let outcome = state.outcome.map(|o| o.name()).unwrap_or("unknown");
        obs::emit_loop_finished(
            &state.run_id,
            outcome,
            state.iterations,
            started.elapsed().as_millis() as u64,
        );
        METRICS.flush();
        state
    }

    async fn checking(&self, state: &mut LoopState, cancel: &CancelToken) {
        if cancel.is_cancelled() {
            state.finish(LoopOutcome::Cancelled, TerminationReason::Cancelled);
            return;
        }

        let report = self.check(&state.current).await;
        obs::emit_check_completed(
            &state.run_id,
            report.generation(),
            report.fatal_count(),
            report.diagnostics().len() - report.fatal_count(),
            report.is_trusted(),
        );
        let valid = report.is_valid();
        let trusted = report.is_trusted();
        state.history.append(report);

        if valid && trusted {
            state.finish(LoopOutcome::Success, TerminationReason::NoFatalDiagnostics);
        } else if valid {
            state.finish(LoopOutcome::Unrecoverable, TerminationReason::NoReasonerVerdict);
        } else if state.iterations < self.config.max_iterations {
            state.phase = LoopPhase::Repairing;
        } else {
            state.finish(
                LoopOutcome::Exhausted,
                TerminationReason::IterationBudgetExhausted,
            );
        }
    }

    async fn repairing(&self, state: &mut LoopState, cancel: &CancelToken) {
        if cancel.is_cancelled() {
            state.finish(LoopOutcome::Cancelled, TerminationReason::Cancelled);
            return;
        }
        let Some(prompt) = state
            .history
            .latest()
            .map(|report| self.composer.compose(report, state.current.text()))
        else {
            state.phase = LoopPhase::Checking;
            return;
        };

        state.iterations += 1;
        METRICS.inc(Counter::RepairsRequested);
        obs::emit_repair_requested(
            &state.run_id,
            state.current.generation(),
            prompt.sections.len(),
        );

        let generation = state.current.generation() + 1;
        match self.requester.request_with_cancel(&prompt, cancel).await {
            Err(RepairError::Cancelled) => {
                state.finish(LoopOutcome::Cancelled, TerminationReason::Cancelled);
            }
            Err(err) => {
                obs::emit_repair_rejected(&state.run_id, generation, &err.to_string());
                state.finish(
                    LoopOutcome::Unrecoverable,
                    TerminationReason::BackendFailure {
                        message: err.to_string(),
                    },
                );
            }
            Ok(text) if text.trim().is_empty() => {
                obs::emit_repair_rejected(&state.run_id, generation, "empty candidate");
                state.finish(LoopOutcome::Unrecoverable, TerminationReason::EmptyRepair);
            }
            Ok(text) if state.current.is_unchanged_by(&text) => {
                obs::emit_repair_rejected(&state.run_id, generation, "unchanged candidate");
                state.finish(LoopOutcome::Unrecoverable, TerminationReason::UnchangedRepair);
            }
            Ok(text) => {
                let next = state.current.successor(text);
                state.advance(next);
                state.phase = LoopPhase::Checking;
            }
        }
    }
}
