//! `Reasoner` implementation backed by an external process.

use std::time::Duration;

use async_trait::async_trait;
use ontorepair_core::{ConfigError, ParsedOntology, Reasoner, ReasonerError, ReasonerVerdict};
use tracing::debug;

use crate::classify::classify_output;
use crate::runner;
use crate::spec::ReasonerSpec;

/// Runs a reasoner command over a temporary Turtle copy of the candidate.
#[derive(Debug, Clone)]
pub struct ProcessReasoner {
    spec: ReasonerSpec,
}

impl ProcessReasoner {
    pub fn new(spec: ReasonerSpec) -> Result<Self, ConfigError> {
        spec.validate()?;
        Ok(Self { spec })
    }

    pub fn spec(&self) -> &ReasonerSpec {
        &self.spec
    }

    fn io_failure(&self, err: std::io::Error) -> ReasonerError {
        ReasonerError::Spawn {
            reasoner: self.spec.id.clone(),
            message: format!("cannot stage input file: {err}"),
        }
    }
}

#[async_trait]
impl Reasoner for ProcessReasoner {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn timeout(&self) -> Option<Duration> {
        (self.spec.timeout_secs > 0).then(|| Duration::from_secs(self.spec.timeout_secs))
    }

    async fn reason(&self, ontology: &ParsedOntology) -> Result<ReasonerVerdict, ReasonerError> {
        // Removed on drop, after the child has exited or been killed.
        let input = tempfile::Builder::new()
            .prefix("ontorepair-")
            .suffix(".ttl")
            .tempfile()
            .map_err(|e| self.io_failure(e))?;
        tokio::fs::write(input.path(), ontology.text())
            .await
            .map_err(|e| self.io_failure(e))?;

        let output = runner::execute(&self.spec, input.path()).await?;
        debug!(
            reasoner = %self.spec.id,
            exit_code = ?output.exit_code,
            duration_ms = output.duration_ms,
            "reasoner finished"
        );
        classify_output(&self.spec.id, &output)
    }
}
