use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tidemark_core::{HookSet, MigrationError, Step, Version};

/// A step as registered for one connection.
#[derive(Clone)]
pub struct RegisteredStep {
    pub version: Version,
    pub name: String,
    pub connection: String,
    /// File the step was loaded from, when it came from disk.
    pub source: Option<PathBuf>,
    /// Hooks declared by the step, captured at registration.
    pub hooks: HookSet,
    pub step: Arc<dyn Step>,
}

impl fmt::Debug for RegisteredStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredStep")
            .field("version", &self.version)
            .field("name", &self.name)
            .field("connection", &self.connection)
            .field("source", &self.source)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Per-connection mapping from version to step.
///
/// Versions are contiguous from 1 within each connection; they are handed out
/// by [`crate::StepLoader`], the only writer.
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    connections: BTreeMap<String, BTreeMap<Version, RegisteredStep>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections with at least one registered step, in name order.
    pub fn connections(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    /// Steps of `connection` in version order.
    pub fn steps_for(&self, connection: &str) -> Vec<&RegisteredStep> {
        self.connections
            .get(connection)
            .map(|steps| steps.values().collect())
            .unwrap_or_default()
    }

    pub fn latest_version(&self, connection: &str) -> Version {
        self.connections
            .get(connection)
            .and_then(|steps| steps.keys().next_back().copied())
            .unwrap_or(0)
    }

    pub fn next_version(&self, connection: &str) -> Version {
        self.latest_version(connection) + 1
    }

    pub fn step_at(
        &self,
        connection: &str,
        version: Version,
    ) -> Result<&RegisteredStep, MigrationError> {
        self.connections
            .get(connection)
            .and_then(|steps| steps.get(&version))
            .ok_or_else(|| MigrationError::StepNotFound {
                connection: connection.to_string(),
                version,
            })
    }

    pub(crate) fn insert(
        &mut self,
        connection: &str,
        name: String,
        source: Option<PathBuf>,
        step: Arc<dyn Step>,
    ) -> Version {
        let version = self.next_version(connection);
        let registered = RegisteredStep {
            version,
            name,
            connection: connection.to_string(),
            source,
            hooks: step.hooks(),
            step,
        };
        self.connections
            .entry(connection.to_string())
            .or_default()
            .insert(version, registered);
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step_file::StepFile;
    use tidemark_core::HookKind;

    fn up_only() -> Arc<dyn Step> {
        Arc::new(StepFile {
            up: Some(vec![]),
            ..Default::default()
        })
    }

    #[test]
    fn test_empty_connection_has_latest_zero_and_next_one() {
        let registry = MigrationRegistry::new();
        assert_eq!(registry.latest_version("customers"), 0);
        assert_eq!(registry.next_version("customers"), 1);
        assert!(registry.steps_for("customers").is_empty());
    }

    #[test]
    fn test_insert_assigns_contiguous_versions_per_connection() {
        let mut registry = MigrationRegistry::new();
        assert_eq!(registry.insert("customers", "A".into(), None, up_only()), 1);
        assert_eq!(registry.insert("billing", "B".into(), None, up_only()), 1);
        assert_eq!(registry.insert("customers", "C".into(), None, up_only()), 2);

        assert_eq!(registry.latest_version("customers"), 2);
        assert_eq!(registry.next_version("customers"), 3);
        assert_eq!(registry.latest_version("billing"), 1);

        let names: Vec<&str> = registry
            .steps_for("customers")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(registry.connections().collect::<Vec<_>>(), vec!["billing", "customers"]);
    }

    #[test]
    fn test_insert_captures_declared_hooks() {
        let mut registry = MigrationRegistry::new();
        registry.insert("customers", "A".into(), None, up_only());
        let step = registry.step_at("customers", 1).unwrap();
        assert!(step.hooks.contains(HookKind::Up));
        assert!(!step.hooks.contains(HookKind::Down));
    }

    #[test]
    fn test_step_at_missing_version_is_step_not_found() {
        let mut registry = MigrationRegistry::new();
        registry.insert("customers", "A".into(), None, up_only());

        let err = registry.step_at("customers", 2).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::StepNotFound { ref connection, version: 2 } if connection == "customers"
        ));
        assert!(registry.step_at("billing", 1).is_err());
    }
}
