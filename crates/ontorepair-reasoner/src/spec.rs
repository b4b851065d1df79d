//! Reasoner definitions and configuration.

use std::path::Path;

use ontorepair_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Placeholder replaced by the path of the candidate file.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Builtin reasoners, each run from a jar through `java`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinReasoner {
    /// java -jar HermiT.jar -k -U --ignoreUnsupportedDatatypes {input}
    Hermit,

    /// java -jar robot.jar reason --reasoner HermiT --input {input}
    Robot,

    /// java -jar robot.jar reason --reasoner JFact --input {input}
    ///
    /// A tableau engine independent of HermiT, driven through ROBOT.
    Jfact,
}

impl BuiltinReasoner {
    pub const ALL: [BuiltinReasoner; 3] = [
        BuiltinReasoner::Hermit,
        BuiltinReasoner::Robot,
        BuiltinReasoner::Jfact,
    ];

    /// Identifier used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinReasoner::Hermit => "hermit",
            BuiltinReasoner::Robot => "robot",
            BuiltinReasoner::Jfact => "jfact",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Jar file name expected inside a jar directory.
    pub fn jar_name(&self) -> &'static str {
        match self {
            BuiltinReasoner::Hermit => "HermiT.jar",
            BuiltinReasoner::Robot | BuiltinReasoner::Jfact => "robot.jar",
        }
    }

    /// Command line for the given jar, with the input placeholder.
    pub fn command(&self, jar: &Path) -> Vec<String> {
        let jar = jar.display().to_string();
        let tail: &[&str] = match self {
            BuiltinReasoner::Hermit => &["-k", "-U", "--ignoreUnsupportedDatatypes", INPUT_PLACEHOLDER],
            BuiltinReasoner::Robot => &["reason", "--reasoner", "HermiT", "--input", INPUT_PLACEHOLDER],
            BuiltinReasoner::Jfact => &["reason", "--reasoner", "JFact", "--input", INPUT_PLACEHOLDER],
        };
        let mut command = vec!["java".to_string(), "-jar".to_string(), jar];
        command.extend(tail.iter().map(|s| s.to_string()));
        command
    }
}

/// Configuration for one reasoner process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReasonerSpec {
    /// Identifier referenced by `LoopConfig::reasoners`.
    pub id: String,

    /// Command to execute (first element is executable). Every occurrence of
    /// `{input}` in an argument is replaced by the candidate file path.
    pub command: Vec<String>,

    /// Timeout in seconds (0 = no process-level limit).
    pub timeout_secs: u64,
}

impl ReasonerSpec {
    /// Spec for a builtin reasoner whose jar lives at `jar`.
    pub fn from_builtin(builtin: BuiltinReasoner, jar: &Path, timeout_secs: u64) -> Self {
        Self {
            id: builtin.name().to_string(),
            command: builtin.command(jar),
            timeout_secs,
        }
    }

    pub fn custom(id: impl Into<String>, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            id: id.into(),
            command,
            timeout_secs,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Invalid("reasoner id is empty".to_string()));
        }
        if self.command.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "reasoner {} has an empty command",
                self.id
            )));
        }
        if !self.command.iter().any(|arg| arg.contains(INPUT_PLACEHOLDER)) {
            return Err(ConfigError::Invalid(format!(
                "reasoner {} command never references {INPUT_PLACEHOLDER}",
                self.id
            )));
        }
        Ok(())
    }

    /// Command line with the placeholder bound to `input`.
    pub fn render(&self, input: &Path) -> Vec<String> {
        let input = input.display().to_string();
        self.command
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input))
            .collect()
    }
}
