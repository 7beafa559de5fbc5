//! In-process backend that records statements instead of running them.
//!
//! Only the version-table statements are interpreted, so the stored version
//! behaves like a real database: writes become visible on commit and are
//! discarded on rollback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tidemark_config::default_version_table;
use tidemark_query::DatabaseBackend;

use super::{Backend, Transaction};
use crate::error::DatabaseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEvent {
    Begin(String),
    Execute { connection: String, sql: String },
    Commit(String),
    Rollback(String),
}

#[derive(Debug, Clone, Default)]
struct VersionRow {
    created: bool,
    version: Option<i64>,
}

#[derive(Debug, Default)]
struct Shared {
    rows: HashMap<String, VersionRow>,
    events: Vec<MemoryEvent>,
    failing: Vec<String>,
    refuse_begin: bool,
    refuse_rollback: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryBackend {
    version_table: String,
    dialect: DatabaseBackend,
    shared: Arc<Mutex<Shared>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_version_table(default_version_table())
    }

    pub fn with_version_table(table: impl Into<String>) -> Self {
        Self {
            version_table: table.into(),
            dialect: DatabaseBackend::Sqlite,
            shared: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every statement containing `fragment` fail.
    pub fn fail_on(&self, fragment: impl Into<String>) {
        self.lock().failing.push(fragment.into());
    }

    /// Make `begin` fail for every connection.
    pub fn refuse_begin(&self) {
        self.lock().refuse_begin = true;
    }

    /// Make `rollback` fail; the transaction's writes are still discarded.
    pub fn refuse_rollback(&self) {
        self.lock().refuse_rollback = true;
    }

    /// Seed the committed version of `connection`.
    pub fn set_stored_version(&self, connection: &str, version: i64) {
        let mut shared = self.lock();
        let row = shared.rows.entry(connection.to_string()).or_default();
        row.created = true;
        row.version = Some(version);
    }

    /// Committed version of `connection`, if any.
    pub fn stored_version(&self, connection: &str) -> Option<i64> {
        self.lock()
            .rows
            .get(connection)
            .and_then(|row| row.version)
    }

    pub fn events(&self) -> Vec<MemoryEvent> {
        self.lock().events.clone()
    }

    /// Statements executed on `connection` that do not touch the version table.
    pub fn executed(&self, connection: &str) -> Vec<String> {
        let quoted = format!("\"{}\"", self.version_table);
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                MemoryEvent::Execute { connection: c, sql } if c == connection => Some(sql),
                _ => None,
            })
            .filter(|sql| !sql.contains(&quoted))
            .cloned()
            .collect()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn begin(&self, connection: &str) -> Result<Box<dyn Transaction>, DatabaseError> {
        let mut shared = self.lock();
        if shared.refuse_begin {
            return Err(DatabaseError::Driver(format!(
                "cannot open transaction on '{connection}'"
            )));
        }
        shared.events.push(MemoryEvent::Begin(connection.to_string()));
        let row = shared.rows.get(connection).cloned().unwrap_or_default();
        Ok(Box::new(MemoryTransaction {
            connection: connection.to_string(),
            quoted_table: format!("\"{}\"", self.version_table),
            dialect: self.dialect,
            row,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MemoryTransaction {
    connection: String,
    quoted_table: String,
    dialect: DatabaseBackend,
    row: VersionRow,
    shared: Arc<Mutex<Shared>>,
}

impl MemoryTransaction {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_version_statement(&mut self, sql: &str) -> Result<(), DatabaseError> {
        if sql.starts_with("CREATE TABLE") {
            self.row.created = true;
        } else if sql.starts_with("DELETE FROM") {
            self.require_table()?;
            self.row.version = None;
        } else if sql.starts_with("INSERT INTO") {
            self.require_table()?;
            let value = sql
                .rsplit_once("VALUES (")
                .and_then(|(_, rest)| rest.strip_suffix(')'))
                .and_then(|v| v.trim().parse::<i64>().ok())
                .ok_or_else(|| DatabaseError::Driver(format!("unparsable insert: {sql}")))?;
            self.row.version = Some(value);
        }
        Ok(())
    }

    fn require_table(&self) -> Result<(), DatabaseError> {
        if self.row.created {
            Ok(())
        } else {
            Err(DatabaseError::Driver(format!(
                "no such table: {}",
                self.quoted_table
            )))
        }
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn backend(&self) -> DatabaseBackend {
        self.dialect
    }

    async fn execute(&mut self, sql: &str) -> Result<(), DatabaseError> {
        {
            let mut shared = self.lock();
            if shared.failing.iter().any(|f| sql.contains(f.as_str())) {
                return Err(DatabaseError::Driver(format!("statement failed: {sql}")));
            }
            shared.events.push(MemoryEvent::Execute {
                connection: self.connection.clone(),
                sql: sql.to_string(),
            });
        }
        if sql.contains(&self.quoted_table) {
            self.apply_version_statement(sql)?;
        }
        Ok(())
    }

    async fn query_i64(&mut self, _sql: &str) -> Result<Option<i64>, DatabaseError> {
        self.require_table()?;
        Ok(self.row.version)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let mut shared = self.lock();
        shared.rows.insert(self.connection.clone(), self.row.clone());
        shared.events.push(MemoryEvent::Commit(self.connection.clone()));
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        let mut shared = self.lock();
        if shared.refuse_rollback {
            return Err(DatabaseError::Driver(format!(
                "cannot roll back '{}'",
                self.connection
            )));
        }
        shared.events.push(MemoryEvent::Rollback(self.connection.clone()));
        Ok(())
    }
}
