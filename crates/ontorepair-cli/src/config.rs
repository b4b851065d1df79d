//! `ontorepair.toml` loading and collaborator assembly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use ontorepair_core::{LoopConfig, Reasoner};
use ontorepair_llm::{BackendConfig, ChatCompletionsBackend};
use ontorepair_reasoner::{BuiltinReasoner, ReasonerRegistry, ReasonerSpec};
use serde::Deserialize;

pub const DEFAULT_JAR_DIR: &str = "jars";
pub const DEFAULT_ARTIFACTS_DIR: &str = ".ontorepair/runs";

/// File-level configuration. Every table is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Directory holding `HermiT.jar` and `robot.jar`.
    pub jar_dir: Option<PathBuf>,

    #[serde(rename = "loop")]
    pub loop_config: LoopConfig,

    pub reasoners: BTreeMap<String, ReasonerEntry>,

    pub backend: BackendSection,
}

/// `[reasoners.<id>]`: a builtin jar location or a custom command.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReasonerEntry {
    pub jar: Option<PathBuf>,
    pub command: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

/// `[backend]`: overrides applied on top of the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendSection {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
}

impl CliConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration file")
    }

    /// Read `path`, or the defaults when no file was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {:?}", path))?;
                Self::parse(&text)
            }
            None => Ok(Self::default()),
        }
    }

    /// Registry of the builtins plus every `[reasoners.<id>]` table.
    pub fn registry(&self, jar_dir: Option<&Path>) -> Result<ReasonerRegistry> {
        let jar_dir = jar_dir
            .map(Path::to_path_buf)
            .or_else(|| self.jar_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JAR_DIR));
        let default_timeout = self.loop_config.reasoner_timeout_secs;
        let mut registry = ReasonerRegistry::with_builtins(&jar_dir, default_timeout);

        for (id, entry) in &self.reasoners {
            let timeout_secs = entry.timeout_secs.unwrap_or(default_timeout);
            let spec = match (&entry.command, &entry.jar, BuiltinReasoner::from_name(id)) {
                (Some(command), _, _) => ReasonerSpec::custom(id.clone(), command.clone(), timeout_secs),
                (None, Some(jar), Some(builtin)) => ReasonerSpec::from_builtin(builtin, jar, timeout_secs),
                (None, None, Some(builtin)) => ReasonerSpec::from_builtin(
                    builtin,
                    &jar_dir.join(builtin.jar_name()),
                    timeout_secs,
                ),
                (None, _, None) => {
                    anyhow::bail!("reasoner {} needs a command (only builtins accept a jar)", id)
                }
            };
            registry.insert(spec);
        }
        Ok(registry)
    }

    pub fn reasoners(&self, jar_dir: Option<&Path>) -> Result<Vec<Arc<dyn Reasoner>>> {
        let registry = self.registry(jar_dir)?;
        Ok(registry.build(&self.loop_config.reasoners)?)
    }

    /// Environment-derived backend settings with the `[backend]` overrides applied.
    pub fn backend_config(&self) -> Result<BackendConfig> {
        let mut config = BackendConfig::from_env()?;
        if let Some(model) = &self.backend.model {
            config.model = model.clone();
        }
        if let Some(base_url) = &self.backend.base_url {
            config.base_url = base_url.clone();
        }
        config.timeout_secs = self
            .backend
            .timeout_secs
            .unwrap_or(self.loop_config.backend_timeout_secs);
        if self.backend.temperature.is_some() {
            config.temperature = self.backend.temperature;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn backend(&self) -> Result<ChatCompletionsBackend> {
        Ok(ChatCompletionsBackend::new(self.backend_config()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
jar_dir = "/opt/jars"

[loop]
max_iterations = 5
reasoners = ["hermit", "grep"]

[reasoners.robot]
jar = "/usr/share/robot/robot.jar"

[reasoners.grep]
command = ["sh", "-c", "grep -q Nothing {input}"]
timeout_secs = 10

[backend]
model = "openai/gpt-4o"
temperature = 0.1
"#;

    #[test]
    fn test_parse_full_config() {
        let config = CliConfig::parse(SAMPLE).expect("config");
        assert_eq!(config.loop_config.max_iterations, 5);
        assert_eq!(config.loop_config.reasoners, vec!["hermit", "grep"]);
        // unspecified loop fields keep their defaults
        assert_eq!(config.loop_config.max_repair_retries, 3);
        assert_eq!(config.backend.model.as_deref(), Some("openai/gpt-4o"));
    }

    #[test]
    fn test_registry_merges_builtins_and_custom() {
        let config = CliConfig::parse(SAMPLE).expect("config");
        let registry = config.registry(None).expect("registry");

        let hermit = registry.get("hermit").expect("hermit");
        assert!(hermit.command.contains(&"/opt/jars/HermiT.jar".to_string()));
        let robot = registry.get("robot").expect("robot");
        assert!(robot.command.contains(&"/usr/share/robot/robot.jar".to_string()));
        let grep = registry.get("grep").expect("grep");
        assert_eq!(grep.timeout_secs, 10);

        let built = config.reasoners(None).expect("reasoners");
        assert_eq!(built.len(), 2);
    }

    #[test]
    fn test_jar_dir_flag_wins() {
        let config = CliConfig::parse(SAMPLE).expect("config");
        let registry = config.registry(Some(Path::new("/tmp/jars"))).expect("registry");
        let hermit = registry.get("hermit").expect("hermit");
        assert!(hermit.command.contains(&"/tmp/jars/HermiT.jar".to_string()));
    }

    #[test]
    fn test_custom_reasoner_without_command_is_rejected() {
        let config = CliConfig::parse("[reasoners.pellet]\njar = \"pellet.jar\"\n").expect("config");
        assert!(config.registry(None).is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(CliConfig::parse("[loop]\nmax_iterations = 3\n[bogus]\nx = 1\n").is_err());
    }

    #[test]
    fn test_missing_file_defaults() {
        let config = CliConfig::load(None).expect("defaults");
        assert_eq!(config.loop_config, LoopConfig::default());
        assert!(config.reasoners.is_empty());
    }
}
