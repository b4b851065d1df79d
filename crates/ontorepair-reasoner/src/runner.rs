//! Reasoner process execution.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use ontorepair_core::ReasonerError;
use tokio::process::Command;
use tracing::debug;

use crate::spec::ReasonerSpec;

/// Captured result of one reasoner process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,

    pub stdout: String,

    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Both streams, stdout first.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Run the reasoner described by `spec` against the file at `input`.
///
/// The child is killed when the future is dropped, so an outer timeout
/// never leaves a JVM behind.
pub async fn execute(spec: &ReasonerSpec, input: &Path) -> Result<ProcessOutput, ReasonerError> {
    let start = Instant::now();

    let command = spec.render(input);
    let Some((exe, args)) = command.split_first() else {
        return Err(ReasonerError::Spawn {
            reasoner: spec.id.clone(),
            message: "empty command".to_string(),
        });
    };

    debug!(reasoner = %spec.id, command = ?command, "spawning reasoner");
    let child = Command::new(exe)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ReasonerError::Spawn {
            reasoner: spec.id.clone(),
            message: e.to_string(),
        })?;

    let waited = if spec.timeout_secs > 0 {
        let limit = Duration::from_secs(spec.timeout_secs);
        tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| ReasonerError::Timeout {
                reasoner: spec.id.clone(),
                timeout: limit,
            })?
    } else {
        child.wait_with_output().await
    };
    let output = waited.map_err(|e| ReasonerError::Crashed {
        reasoner: spec.id.clone(),
        exit_code: None,
        message: e.to_string(),
    })?;

    Ok(ProcessOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
