//! In-memory fakes for the loop collaborators (testing only)
//!
//! Provides `ScriptedReasoner`, `ScriptedBackend` and `CountingChecker`,
//! which satisfy the trait contracts deterministically and count calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::checker::{Checker, Reasoner, ReasonerVerdict};
use crate::composer::RepairPrompt;
use crate::domain::{BackendError, CheckerKind, ReasonerError, ValidationReport};
use crate::graph::ParsedOntology;
use crate::repair::GenerativeBackend;

// ---------------------------------------------------------------------------
// ScriptedReasoner
// ---------------------------------------------------------------------------

/// Reasoner that replays a script of results, repeating the last one.
#[derive(Debug)]
pub struct ScriptedReasoner {
    id: String,
    script: Mutex<VecDeque<Result<ReasonerVerdict, ReasonerError>>>,
    delay: Option<Duration>,
    timeout: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedReasoner {
    pub fn scripted(id: &str, script: Vec<Result<ReasonerVerdict, ReasonerError>>) -> Self {
        Self {
            id: id.to_string(),
            script: Mutex::new(script.into()),
            delay: None,
            timeout: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn coherent(id: &str) -> Self {
        Self::scripted(id, vec![Ok(ReasonerVerdict::coherent())])
    }

    pub fn unsatisfiable(id: &str, classes: &[&str]) -> Self {
        Self::scripted(
            id,
            vec![Ok(ReasonerVerdict::Consistent {
                unsatisfiable: classes.iter().map(|c| c.to_string()).collect(),
            })],
        )
    }

    pub fn inconsistent(id: &str) -> Self {
        Self::scripted(id, vec![Ok(ReasonerVerdict::Inconsistent { detail: None })])
    }

    pub fn failing(id: &str) -> Self {
        Self::scripted(
            id,
            vec![Err(ReasonerError::Crashed {
                reasoner: id.to_string(),
                exit_code: Some(1),
                message: "java.lang.OutOfMemoryError".to_string(),
            })],
        )
    }

    /// Sleep before answering (use with paused tokio time).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report an own time limit to the consistency checker.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    fn id(&self) -> &str {
        &self.id
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn reason(&self, _ontology: &ParsedOntology) -> Result<ReasonerVerdict, ReasonerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        next.unwrap_or_else(|| Ok(ReasonerVerdict::coherent()))
    }
}

// ---------------------------------------------------------------------------
// ScriptedBackend
// ---------------------------------------------------------------------------

/// Generative backend that replays scripted replies and records prompts.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, BackendError>>>,
    prompts: Mutex<Vec<RepairPrompt>>,
    first_delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<String, BackendError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Replies wrapped in Turtle markers, as a well-behaved model answers.
    pub fn replying(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|r| Ok(format!("###start_turtle###\n{r}\n###end_turtle###")))
                .collect(),
        )
    }

    /// Delay only the first call (use with paused tokio time).
    pub fn with_first_delay(mut self, delay: Duration) -> Self {
        self.first_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<RepairPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn complete(&self, prompt: &RepairPrompt) -> Result<String, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        let next = self.script.lock().unwrap().pop_front();
        if call == 0 {
            if let Some(delay) = self.first_delay {
                tokio::time::sleep(delay).await;
            }
        }
        next.unwrap_or_else(|| Err(BackendError::Content("script exhausted".to_string())))
    }
}

// ---------------------------------------------------------------------------
// CountingChecker
// ---------------------------------------------------------------------------

/// Wraps a checker and counts how often it runs.
pub struct CountingChecker {
    inner: Arc<dyn Checker>,
    calls: AtomicUsize,
}

impl CountingChecker {
    pub fn new(inner: Arc<dyn Checker>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Checker for CountingChecker {
    fn kind(&self) -> CheckerKind {
        self.inner.kind()
    }

    async fn check(&self, ontology: &ParsedOntology) -> ValidationReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.check(ontology).await
    }
}
