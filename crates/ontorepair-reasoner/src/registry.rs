//! Resolves configured reasoner identifiers to runnable reasoners.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use ontorepair_core::{ConfigError, Reasoner};

use crate::process::ProcessReasoner;
use crate::spec::{BuiltinReasoner, ReasonerSpec};

/// Known reasoner specs keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct ReasonerRegistry {
    specs: BTreeMap<String, ReasonerSpec>,
}

impl ReasonerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every builtin, with jars looked up in `jar_dir`.
    pub fn with_builtins(jar_dir: &Path, timeout_secs: u64) -> Self {
        let mut registry = Self::new();
        for builtin in BuiltinReasoner::ALL {
            registry.insert(ReasonerSpec::from_builtin(
                builtin,
                &jar_dir.join(builtin.jar_name()),
                timeout_secs,
            ));
        }
        registry
    }

    /// Add or replace a spec.
    pub fn insert(&mut self, spec: ReasonerSpec) {
        self.specs.insert(spec.id.clone(), spec);
    }

    pub fn get(&self, id: &str) -> Option<&ReasonerSpec> {
        self.specs.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Build the reasoners named by `ids`, in that order.
    pub fn build(&self, ids: &[String]) -> Result<Vec<Arc<dyn Reasoner>>, ConfigError> {
        ids.iter()
            .map(|id| {
                let spec = self
                    .specs
                    .get(id)
                    .ok_or_else(|| ConfigError::UnknownReasoner(id.clone()))?;
                let reasoner: Arc<dyn Reasoner> = Arc::new(ProcessReasoner::new(spec.clone())?);
                Ok(reasoner)
            })
            .collect()
    }
}
