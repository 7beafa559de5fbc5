use tidemark_config::{TidemarkConfig, default_version_table};
use tidemark_core::{
    ChangeSet, Direction, ErrorList, ErrorRecord, HookKind, MigrationError, Phase, Version,
    step_path,
};
use tidemark_loader::{MigrationRegistry, RegisteredStep};
use tracing::{debug, info, warn};

use crate::backend::{Backend, Transaction};
use crate::error::{DatabaseError, MigrateError};
use crate::processor::ChangeProcessor;
use crate::version_store::VersionStore;

/// Result of a `migrate` call that did not raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Changes committed; the connection is now at this version.
    Applied(Version),
    /// Every step ran cleanly and was rolled back.
    DryRun(Version),
    /// A dry run recorded errors, see [`MigrationEngine::errors`].
    DryRunFailed,
}

impl Outcome {
    pub fn version(self) -> Option<Version> {
        match self {
            Outcome::Applied(v) | Outcome::DryRun(v) => Some(v),
            Outcome::DryRunFailed => None,
        }
    }

    pub fn is_success(self) -> bool {
        !matches!(self, Outcome::DryRunFailed)
    }
}

/// Moves connections between versions of their registered steps.
///
/// Each `migrate` call runs every step between the stored version and the
/// target inside one transaction, which is committed only when no error was
/// recorded and the call is not a dry run.
pub struct MigrationEngine<B: Backend> {
    backend: B,
    registry: MigrationRegistry,
    processor: ChangeProcessor,
    versions: VersionStore,
    errors: ErrorList,
}

impl<B: Backend> MigrationEngine<B> {
    pub fn new(backend: B, registry: MigrationRegistry, version_table: impl Into<String>) -> Self {
        Self::with_processor(backend, registry, version_table, ChangeProcessor::new())
    }

    pub fn with_processor(
        backend: B,
        registry: MigrationRegistry,
        version_table: impl Into<String>,
        processor: ChangeProcessor,
    ) -> Self {
        Self {
            backend,
            registry,
            processor,
            versions: VersionStore::new(version_table),
            errors: ErrorList::new(),
        }
    }

    /// Errors recorded by the last `migrate` call.
    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    pub fn processor_mut(&mut self) -> &mut ChangeProcessor {
        &mut self.processor
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Stored version of `connection`, creating the version table if needed.
    pub async fn current_version(&mut self, connection: &str) -> Result<Version, DatabaseError> {
        self.versions.ensure_schema(&self.backend, connection).await?;
        let mut tx = self.backend.begin(connection).await?;
        let version = self.versions.current_version(tx.as_mut()).await;
        tx.rollback().await?;
        version
    }

    /// Move `connection` to `target`, or to its latest registered version.
    pub async fn migrate(
        &mut self,
        connection: &str,
        target: Option<Version>,
        dry_run: bool,
    ) -> Result<Outcome, MigrateError> {
        self.errors.clear();
        let target = target.unwrap_or_else(|| self.registry.latest_version(connection));

        if let Err(err) = self
            .versions
            .ensure_schema(&self.backend, connection)
            .await
        {
            self.record(Phase::VersionStore, None, err.into());
            return self.outcome(connection, target, dry_run);
        }

        let mut tx = match self.backend.begin(connection).await {
            Ok(tx) => tx,
            Err(err) => {
                self.record(Phase::Transaction, None, err.into());
                return self.outcome(connection, target, dry_run);
            }
        };

        let from = match self.versions.current_version(tx.as_mut()).await {
            Ok(version) => version,
            Err(err) => {
                self.record(Phase::VersionStore, None, err.into());
                if let Err(err) = tx.rollback().await {
                    self.record(Phase::Transaction, None, err.into());
                }
                return self.outcome(connection, target, dry_run);
            }
        };

        match Direction::between(from, target) {
            Some(direction) => {
                info!(connection, from, target, %direction, dry_run, "migrating");
                for version in step_path(from, target) {
                    self.do_step(tx.as_mut(), connection, direction, version).await;
                }
            }
            None => debug!(connection, version = from, "already at target version"),
        }

        let commit = self.errors.is_empty() && !dry_run;
        let closed = if commit {
            tx.commit().await
        } else {
            tx.rollback().await
        };
        if let Err(err) = closed {
            self.record(Phase::Transaction, None, err.into());
        }

        if commit && self.errors.is_empty() && from != target {
            if let Err(err) = self
                .versions
                .set_current_version(&self.backend, connection, target)
                .await
            {
                self.record(Phase::VersionStore, None, err.into());
            }
        }

        self.outcome(connection, target, dry_run)
    }

    async fn do_step(
        &mut self,
        tx: &mut dyn Transaction,
        connection: &str,
        direction: Direction,
        version: Version,
    ) {
        let step = match self.registry.step_at(connection, version) {
            Ok(step) => step.clone(),
            Err(err) => {
                self.record(Phase::Resolve, Some(version), err);
                return;
            }
        };
        debug!(connection, version, name = %step.name, %direction, "running step");

        let hooks = [
            step.hooks.pre_hook(direction),
            step.hooks.main_hook(direction),
            step.hooks.post_hook(direction),
        ];
        for hook in hooks.into_iter().flatten() {
            if !self.run_hook(tx, &step, hook, direction).await {
                break;
            }
        }
    }

    /// Run one hook and dispatch its changes. Returns `false` when the hook
    /// itself failed and the rest of the step must be skipped.
    async fn run_hook(
        &mut self,
        tx: &mut dyn Transaction,
        step: &RegisteredStep,
        hook: HookKind,
        direction: Direction,
    ) -> bool {
        let mut changes = ChangeSet::new();
        if let Err(source) = step.step.run(hook, direction, &mut changes) {
            self.record(
                Phase::Hook(hook),
                Some(step.version),
                MigrationError::StepExecution {
                    version: step.version,
                    name: step.name.clone(),
                    hook,
                    source,
                },
            );
            return false;
        }

        // migrate hooks declare up-form changes; walking down undoes them last to first
        let undo = hook == HookKind::Migrate && direction == Direction::Down;
        if undo {
            changes.reverse();
        }
        for change in changes.iter() {
            let applied = if undo {
                self.processor.apply_inverse(tx, change).await
            } else {
                self.processor.apply(tx, change).await
            };
            if let Err(err) = applied {
                self.record(Phase::Change, Some(step.version), err);
            }
        }
        true
    }

    fn record(&mut self, phase: Phase, version: Option<Version>, error: MigrationError) {
        warn!(%phase, ?version, %error, "migration error");
        self.errors.push(ErrorRecord::new(phase, version, error));
    }

    fn outcome(
        &self,
        connection: &str,
        target: Version,
        dry_run: bool,
    ) -> Result<Outcome, MigrateError> {
        if !self.errors.is_empty() {
            warn!(connection, errors = self.errors.len(), dry_run, "migration failed");
            return if dry_run {
                Ok(Outcome::DryRunFailed)
            } else {
                Err(MigrateError::Aggregate {
                    connection: connection.to_string(),
                    errors: self.errors.clone(),
                })
            };
        }
        if dry_run {
            info!(connection, target, "dry run succeeded");
            Ok(Outcome::DryRun(target))
        } else {
            info!(connection, version = target, "migrated");
            Ok(Outcome::Applied(target))
        }
    }
}

/// Settings for [`run_migrations`].
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub version_table: String,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            version_table: default_version_table(),
        }
    }
}

impl From<&TidemarkConfig> for MigrationOptions {
    fn from(config: &TidemarkConfig) -> Self {
        Self {
            version_table: config.version_table(),
        }
    }
}

/// Bring every registered connection to its latest version, one after
/// another. Stops at the first connection that fails.
pub async fn run_migrations<B: Backend>(
    backend: B,
    registry: MigrationRegistry,
    options: MigrationOptions,
) -> Result<(), MigrateError> {
    let connections: Vec<String> = registry.connections().map(str::to_string).collect();
    let mut engine = MigrationEngine::new(backend, registry, options.version_table);
    for connection in &connections {
        engine.migrate(connection, None, false).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use tidemark_config::FileFormat;
    use tidemark_core::action::RawSql;
    use tidemark_core::{Change, ChangeError, HookSet, Step, StepError};
    use tidemark_loader::{StepFile, StepLoader};
    use tidemark_query::sql::raw_sql::build_raw_sql;
    use tidemark_query::{BuiltQuery, DatabaseBackend, QueryError};

    use super::*;
    use crate::backend::{MemoryBackend, MemoryEvent};

    const CUSTOMERS: &str = "customers";

    type Log = Arc<Mutex<Vec<String>>>;

    /// Records every hook call as `<name>:<hook>`.
    struct Recorder {
        name: String,
        hooks: HookSet,
        log: Log,
        changes: Vec<Change>,
        fail: Option<HookKind>,
    }

    impl Recorder {
        fn new(name: &str, hooks: &[HookKind], log: &Log) -> Self {
            Self {
                name: name.to_string(),
                hooks: hooks.iter().copied().collect(),
                log: Arc::clone(log),
                changes: Vec::new(),
                fail: None,
            }
        }

        fn failing(mut self, hook: HookKind) -> Self {
            self.fail = Some(hook);
            self
        }
    }

    impl Step for Recorder {
        fn hooks(&self) -> HookSet {
            self.hooks
        }

        fn run(
            &self,
            hook: HookKind,
            _direction: Direction,
            changes: &mut ChangeSet,
        ) -> Result<(), StepError> {
            self.log.lock().unwrap().push(format!("{}:{hook}", self.name));
            if self.fail == Some(hook) {
                return Err(StepError::Failed("boom".into()));
            }
            changes.extend(self.changes.clone());
            Ok(())
        }
    }

    fn step_file(value: serde_json::Value) -> Arc<dyn Step> {
        Arc::new(StepFile::parse(&value.to_string(), FileFormat::Json).unwrap())
    }

    fn customers_registry() -> MigrationRegistry {
        let mut registry = MigrationRegistry::new();
        let mut loader = StepLoader::new();
        loader.register_step(
            &mut registry,
            "CreateCustomers",
            None,
            CUSTOMERS,
            step_file(json!({
                "up": [{
                    "type": "create_table",
                    "table": "customers",
                    "columns": [{"name": "id", "type": "integer"}]
                }],
                "down": [{"type": "drop_table", "table": "customers"}]
            })),
        );
        loader.register_step(
            &mut registry,
            "AddEmail",
            None,
            CUSTOMERS,
            step_file(json!({
                "up": [{
                    "type": "add_column",
                    "table": "customers",
                    "column": {"name": "email", "type": "text"}
                }],
                "down": [{"type": "remove_column", "table": "customers", "column": "email"}]
            })),
        );
        registry
    }

    fn recorder_registry(log: &Log, count: usize) -> MigrationRegistry {
        let mut registry = MigrationRegistry::new();
        let mut loader = StepLoader::new();
        for i in 1..=count {
            let name = format!("s{i}");
            let step = Recorder::new(&name, &[HookKind::Up, HookKind::Down], log);
            loader.register_step(&mut registry, name, None, CUSTOMERS, Arc::new(step));
        }
        registry
    }

    fn engine(
        backend: &MemoryBackend,
        registry: MigrationRegistry,
    ) -> MigrationEngine<MemoryBackend> {
        MigrationEngine::new(backend.clone(), registry, "migration_version")
    }

    fn log_entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Every opened transaction is closed exactly once.
    fn assert_balanced(events: &[MemoryEvent]) {
        let begins = events
            .iter()
            .filter(|e| matches!(e, MemoryEvent::Begin(_)))
            .count();
        let closes = events
            .iter()
            .filter(|e| matches!(e, MemoryEvent::Commit(_) | MemoryEvent::Rollback(_)))
            .count();
        assert_eq!(begins, closes, "unbalanced transactions: {events:?}");
    }

    #[tokio::test]
    async fn test_scenario_a_applies_steps_in_order_and_commits() {
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 0);
        let mut engine = engine(&backend, customers_registry());

        let outcome = engine.migrate(CUSTOMERS, Some(2), false).await.unwrap();

        assert_eq!(outcome, Outcome::Applied(2));
        assert!(engine.errors().is_empty());
        assert_eq!(backend.stored_version(CUSTOMERS), Some(2));
        let executed = backend.executed(CUSTOMERS);
        assert_eq!(executed.len(), 2);
        assert!(executed[0].starts_with("CREATE TABLE \"customers\""));
        assert!(executed[1].contains("ADD COLUMN \"email\""));
        assert!(backend.events().contains(&MemoryEvent::Commit(CUSTOMERS.into())));
        assert_balanced(&backend.events());
    }

    #[tokio::test]
    async fn test_scenario_b_walks_down_in_reverse() {
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 2);
        let mut engine = engine(&backend, customers_registry());

        let outcome = engine.migrate(CUSTOMERS, Some(0), false).await.unwrap();

        assert_eq!(outcome, Outcome::Applied(0));
        assert_eq!(backend.stored_version(CUSTOMERS), Some(0));
        let executed = backend.executed(CUSTOMERS);
        assert_eq!(executed.len(), 2);
        assert!(executed[0].contains("DROP COLUMN \"email\""));
        assert_eq!(executed[1], "DROP TABLE \"customers\"");
    }

    #[tokio::test]
    async fn test_scenario_c_failed_change_rolls_back_and_raises() {
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 0);
        backend.fail_on("ADD COLUMN");
        let mut engine = engine(&backend, customers_registry());

        let err = engine.migrate(CUSTOMERS, Some(2), false).await.unwrap_err();

        let errors = err.errors();
        assert_eq!(errors.len(), 1);
        let record = errors.iter().next().unwrap();
        assert_eq!(record.phase, Phase::Change);
        assert_eq!(record.version, Some(2));
        assert!(matches!(
            record.error,
            MigrationError::ChangeFailed { ref change_type, .. } if change_type == "add_column"
        ));
        assert_eq!(backend.stored_version(CUSTOMERS), Some(0));
        assert_eq!(
            backend.events().last(),
            Some(&MemoryEvent::Rollback(CUSTOMERS.into()))
        );
        assert_balanced(&backend.events());
    }

    #[tokio::test]
    async fn test_scenario_d_dry_run_failure_does_not_raise() {
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 0);
        backend.fail_on("ADD COLUMN");
        let mut engine = engine(&backend, customers_registry());

        let outcome = engine.migrate(CUSTOMERS, Some(2), true).await.unwrap();

        assert_eq!(outcome, Outcome::DryRunFailed);
        assert!(!outcome.is_success());
        assert_eq!(engine.errors().len(), 1);
        assert_eq!(backend.stored_version(CUSTOMERS), Some(0));
        assert_balanced(&backend.events());
    }

    #[tokio::test]
    async fn test_dry_run_success_rolls_back_without_storing() {
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 0);
        let mut engine = engine(&backend, customers_registry());

        let outcome = engine.migrate(CUSTOMERS, None, true).await.unwrap();

        assert_eq!(outcome, Outcome::DryRun(2));
        assert_eq!(outcome.version(), Some(2));
        assert_eq!(backend.stored_version(CUSTOMERS), Some(0));
        assert_eq!(backend.executed(CUSTOMERS).len(), 2);
        assert_eq!(
            backend.events().last(),
            Some(&MemoryEvent::Rollback(CUSTOMERS.into()))
        );
    }

    #[tokio::test]
    async fn test_migrate_to_current_version_is_a_no_op() {
        let log = Log::default();
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 2);
        let mut engine = engine(&backend, recorder_registry(&log, 2));

        let outcome = engine.migrate(CUSTOMERS, None, false).await.unwrap();

        assert_eq!(outcome, Outcome::Applied(2));
        assert!(log_entries(&log).is_empty());
        let events = backend.events();
        // version table setup, then the migrate transaction; no version write
        let begins = events
            .iter()
            .filter(|e| matches!(e, MemoryEvent::Begin(_)))
            .count();
        assert_eq!(begins, 2);
        assert_eq!(events.last(), Some(&MemoryEvent::Commit(CUSTOMERS.into())));
        assert_balanced(&events);
    }

    #[tokio::test]
    async fn test_up_and_down_walk_in_execution_order() {
        let log = Log::default();
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 1);
        let mut engine = engine(&backend, recorder_registry(&log, 5));

        engine.migrate(CUSTOMERS, Some(4), false).await.unwrap();
        assert_eq!(log_entries(&log), vec!["s2:up", "s3:up", "s4:up"]);

        log.lock().unwrap().clear();
        engine.migrate(CUSTOMERS, Some(2), false).await.unwrap();
        assert_eq!(log_entries(&log), vec!["s4:down", "s3:down"]);
        assert_eq!(backend.stored_version(CUSTOMERS), Some(2));
    }

    #[tokio::test]
    async fn test_hooks_run_pre_main_post() {
        let log = Log::default();
        let mut registry = MigrationRegistry::new();
        let step = Recorder::new(
            "s1",
            &[
                HookKind::PreUp,
                HookKind::PostUp,
                HookKind::PreDown,
                HookKind::PostDown,
                HookKind::Migrate,
            ],
            &log,
        );
        StepLoader::new().register_step(&mut registry, "s1", None, CUSTOMERS, Arc::new(step));
        let backend = MemoryBackend::new();
        let mut engine = engine(&backend, registry);

        engine.migrate(CUSTOMERS, Some(1), false).await.unwrap();
        engine.migrate(CUSTOMERS, Some(0), false).await.unwrap();

        assert_eq!(
            log_entries(&log),
            vec![
                "s1:pre-up",
                "s1:migrate",
                "s1:post-up",
                "s1:pre-down",
                "s1:migrate",
                "s1:post-down"
            ]
        );
    }

    #[tokio::test]
    async fn test_generic_hook_changes_are_reversed_on_down() {
        let mut registry = MigrationRegistry::new();
        StepLoader::new().register_step(
            &mut registry,
            "CreateCustomers",
            None,
            CUSTOMERS,
            step_file(json!({
                "migrate": [
                    {
                        "type": "create_table",
                        "table": "customers",
                        "columns": [{"name": "id", "type": "integer"}]
                    },
                    {
                        "type": "add_index",
                        "table": "customers",
                        "index": {"name": "idx_customers_id", "columns": ["id"]}
                    }
                ]
            })),
        );
        let backend = MemoryBackend::new();
        let mut engine = engine(&backend, registry);

        engine.migrate(CUSTOMERS, Some(1), false).await.unwrap();
        let up = backend.executed(CUSTOMERS);
        assert!(up[0].starts_with("CREATE TABLE"));
        assert!(up[1].starts_with("CREATE INDEX"));

        backend.clear_events();
        engine.migrate(CUSTOMERS, Some(0), false).await.unwrap();
        let down = backend.executed(CUSTOMERS);
        assert_eq!(down.len(), 2);
        assert!(down[0].starts_with("DROP INDEX"));
        assert_eq!(down[1], "DROP TABLE \"customers\"");
    }

    fn seed_rows(_: &DatabaseBackend, change: &Change) -> Result<Vec<BuiltQuery>, QueryError> {
        let table = change.payload["table"].as_str().unwrap_or_default();
        Ok(vec![build_raw_sql(format!("INSERT INTO {table} DEFAULT VALUES"))])
    }

    fn unseed_rows(change: &Change) -> Result<Change, ChangeError> {
        let table = change.payload["table"].as_str().unwrap_or_default();
        Change::from_action(&RawSql {
            sql: format!("DELETE FROM {table}"),
            down: None,
        })
    }

    fn migrate_hook_registry(changes: serde_json::Value) -> MigrationRegistry {
        let mut registry = MigrationRegistry::new();
        StepLoader::new().register_step(
            &mut registry,
            "Seed",
            None,
            CUSTOMERS,
            step_file(json!({ "migrate": changes })),
        );
        registry
    }

    #[tokio::test]
    async fn test_unknown_type_in_migrate_hook_walked_down() {
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 1);
        let registry =
            migrate_hook_registry(json!([{"type": "explode_table", "table": "customers"}]));
        let mut engine = engine(&backend, registry);

        let err = engine.migrate(CUSTOMERS, Some(0), false).await.unwrap_err();

        let errors = err.errors();
        assert_eq!(errors.len(), 1);
        let record = errors.iter().next().unwrap();
        assert_eq!(record.phase, Phase::Change);
        assert_eq!(record.version, Some(1));
        assert!(matches!(
            record.error,
            MigrationError::UnknownChangeType(ref t) if t == "explode_table"
        ));
        assert_eq!(backend.stored_version(CUSTOMERS), Some(1));
        assert_balanced(&backend.events());
    }

    #[tokio::test]
    async fn test_irreversible_change_in_migrate_hook_walked_down() {
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 1);
        let registry =
            migrate_hook_registry(json!([{"type": "drop_table", "table": "customers"}]));
        let mut engine = engine(&backend, registry);

        let err = engine.migrate(CUSTOMERS, Some(0), false).await.unwrap_err();

        let record = err.errors().iter().next().unwrap();
        assert_eq!(record.phase, Phase::Change);
        assert!(matches!(
            record.error,
            MigrationError::ChangeFailed { ref change_type, .. } if change_type == "drop_table"
        ));
        assert!(backend.executed(CUSTOMERS).is_empty());
    }

    #[tokio::test]
    async fn test_registered_inverse_walks_migrate_hook_down() {
        let backend = MemoryBackend::new();
        let registry = migrate_hook_registry(json!([
            {
                "type": "create_table",
                "table": "customers",
                "columns": [{"name": "id", "type": "integer"}]
            },
            {"type": "seed_rows", "table": "customers"}
        ]));
        let mut engine = engine(&backend, registry);
        engine
            .processor_mut()
            .register_with_inverse("seed_rows", seed_rows, unseed_rows);

        assert_eq!(
            engine.migrate(CUSTOMERS, None, false).await.unwrap(),
            Outcome::Applied(1)
        );
        let up = backend.executed(CUSTOMERS);
        assert!(up[0].starts_with("CREATE TABLE"));
        assert_eq!(up[1], "INSERT INTO customers DEFAULT VALUES");

        backend.clear_events();
        assert_eq!(
            engine.migrate(CUSTOMERS, Some(0), false).await.unwrap(),
            Outcome::Applied(0)
        );
        assert_eq!(
            backend.executed(CUSTOMERS),
            vec!["DELETE FROM customers", "DROP TABLE \"customers\""]
        );
        assert_eq!(backend.stored_version(CUSTOMERS), Some(0));
    }

    #[tokio::test]
    async fn test_failed_version_write_keeps_committed_changes() {
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 0);
        backend.fail_on("INSERT INTO \"migration_version\"");
        let mut engine = engine(&backend, customers_registry());

        let err = engine.migrate(CUSTOMERS, Some(2), false).await.unwrap_err();

        let errors = err.errors();
        assert_eq!(errors.len(), 1);
        let record = errors.iter().next().unwrap();
        assert_eq!(record.phase, Phase::VersionStore);
        assert!(matches!(record.error, MigrationError::Database(_)));

        // schema changes stay committed, the version write is rolled back
        let events = backend.events();
        let commits = events
            .iter()
            .filter(|e| matches!(e, MemoryEvent::Commit(_)))
            .count();
        assert_eq!(commits, 2);
        assert_eq!(backend.executed(CUSTOMERS).len(), 2);
        assert_eq!(events.last(), Some(&MemoryEvent::Rollback(CUSTOMERS.into())));
        assert_eq!(backend.stored_version(CUSTOMERS), Some(0));
        assert_balanced(&events);
    }

    #[tokio::test]
    async fn test_unknown_change_type_fails_the_batch() {
        let mut registry = MigrationRegistry::new();
        StepLoader::new().register_step(
            &mut registry,
            "Explode",
            None,
            CUSTOMERS,
            step_file(json!({"up": [{"type": "explode_table", "table": "customers"}]})),
        );
        let backend = MemoryBackend::new();
        let mut engine = engine(&backend, registry);

        let err = engine.migrate(CUSTOMERS, None, false).await.unwrap_err();

        let record = err.errors().iter().next().unwrap();
        assert!(matches!(
            record.error,
            MigrationError::UnknownChangeType(ref t) if t == "explode_table"
        ));
        assert_eq!(backend.stored_version(CUSTOMERS), None);
    }

    #[tokio::test]
    async fn test_failing_hook_ends_step_and_loop_continues() {
        let log = Log::default();
        let mut registry = MigrationRegistry::new();
        let mut loader = StepLoader::new();
        let first =
            Recorder::new("s1", &[HookKind::PreUp, HookKind::Up], &log).failing(HookKind::PreUp);
        let second = Recorder::new("s2", &[HookKind::Up], &log);
        loader.register_step(&mut registry, "s1", None, CUSTOMERS, Arc::new(first));
        loader.register_step(&mut registry, "s2", None, CUSTOMERS, Arc::new(second));
        let backend = MemoryBackend::new();
        let mut engine = engine(&backend, registry);

        let err = engine.migrate(CUSTOMERS, None, false).await.unwrap_err();

        assert_eq!(log_entries(&log), vec!["s1:pre-up", "s2:up"]);
        let record = err.errors().iter().next().unwrap();
        assert_eq!(record.phase, Phase::Hook(HookKind::PreUp));
        assert_eq!(record.version, Some(1));
        assert!(matches!(
            record.error,
            MigrationError::StepExecution {
                hook: HookKind::PreUp,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unregistered_target_records_resolve_errors() {
        let log = Log::default();
        let backend = MemoryBackend::new();
        let mut engine = engine(&backend, recorder_registry(&log, 2));

        let err = engine.migrate(CUSTOMERS, Some(4), false).await.unwrap_err();

        assert_eq!(log_entries(&log), vec!["s1:up", "s2:up"]);
        let resolved: Vec<Option<Version>> = err
            .errors()
            .iter()
            .filter(|r| r.phase == Phase::Resolve)
            .map(|r| r.version)
            .collect();
        assert_eq!(resolved, vec![Some(3), Some(4)]);
        assert_eq!(backend.stored_version(CUSTOMERS), None);
        assert_balanced(&backend.events());
    }

    #[tokio::test]
    async fn test_errors_are_cleared_between_calls() {
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 0);
        backend.fail_on("ADD COLUMN");
        let mut engine = engine(&backend, customers_registry());

        engine.migrate(CUSTOMERS, Some(2), true).await.unwrap();
        assert_eq!(engine.errors().len(), 1);

        engine.migrate(CUSTOMERS, Some(1), false).await.unwrap();
        assert!(engine.errors().is_empty());
        assert_eq!(backend.stored_version(CUSTOMERS), Some(1));
    }

    #[tokio::test]
    async fn test_backend_failure_is_recorded() {
        let backend = MemoryBackend::new();
        backend.refuse_begin();
        let mut engine = engine(&backend, customers_registry());

        let err = engine.migrate(CUSTOMERS, None, false).await.unwrap_err();
        assert!(matches!(err.errors().iter().next().unwrap().error, MigrationError::Database(_)));

        let outcome = engine.migrate(CUSTOMERS, None, true).await.unwrap();
        assert_eq!(outcome, Outcome::DryRunFailed);
        assert!(backend.events().is_empty());
    }

    #[tokio::test]
    async fn test_current_version_reads_without_writing() {
        let backend = MemoryBackend::new();
        backend.set_stored_version(CUSTOMERS, 1);
        let mut engine = engine(&backend, customers_registry());

        assert_eq!(engine.current_version(CUSTOMERS).await.unwrap(), 1);
        assert_eq!(
            backend.events().last(),
            Some(&MemoryEvent::Rollback(CUSTOMERS.into()))
        );
    }

    #[tokio::test]
    async fn test_run_migrations_brings_every_connection_up() {
        let log = Log::default();
        let mut registry = recorder_registry(&log, 2);
        StepLoader::new().register_step(
            &mut registry,
            "billing",
            None,
            "billing",
            Arc::new(Recorder::new("b1", &[HookKind::Up], &log)),
        );
        let backend = MemoryBackend::new();

        run_migrations(backend.clone(), registry, MigrationOptions::default())
            .await
            .unwrap();

        assert_eq!(backend.stored_version(CUSTOMERS), Some(2));
        assert_eq!(backend.stored_version("billing"), Some(1));
        assert_eq!(log_entries(&log), vec!["b1:up", "s1:up", "s2:up"]);
    }
}
