use std::collections::HashSet;

use tidemark_core::Version;
use tidemark_query::{
    build_clear_version, build_create_version_table, build_insert_version, build_select_version,
};
use tracing::{debug, warn};

use crate::backend::{Backend, Transaction};
use crate::error::DatabaseError;

/// Reads and writes the applied version of each connection.
///
/// The backing table is created lazily, at most once per connection for the
/// lifetime of the store.
#[derive(Debug)]
pub struct VersionStore {
    table: String,
    created: HashSet<String>,
}

impl VersionStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            created: HashSet::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the version table on `connection` if this store has not done so yet.
    pub async fn ensure_schema<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        connection: &str,
    ) -> Result<(), DatabaseError> {
        if self.created.contains(connection) {
            return Ok(());
        }
        let mut tx = backend.begin(connection).await?;
        let sql = build_create_version_table(&self.table).build(tx.backend());
        if let Err(err) = tx.execute(&sql).await {
            if let Err(rollback) = tx.rollback().await {
                warn!(connection, error = %rollback, "rollback after failed version table setup");
            }
            return Err(err);
        }
        tx.commit().await?;
        debug!(connection, table = %self.table, "version table ready");
        self.created.insert(connection.to_string());
        Ok(())
    }

    /// Applied version as seen by `tx`; 0 when nothing was stored yet.
    pub async fn current_version(
        &self,
        tx: &mut dyn Transaction,
    ) -> Result<Version, DatabaseError> {
        let sql = build_select_version(&self.table).build(tx.backend());
        match tx.query_i64(&sql).await? {
            Some(value) => {
                Version::try_from(value).map_err(|_| DatabaseError::InvalidVersion(value))
            }
            None => Ok(0),
        }
    }

    /// Replace the stored version of `connection` in its own transaction.
    pub async fn set_current_version<B: Backend + ?Sized>(
        &self,
        backend: &B,
        connection: &str,
        version: Version,
    ) -> Result<(), DatabaseError> {
        let mut tx = backend.begin(connection).await?;
        let dialect = tx.backend();
        let statements = [
            build_clear_version(&self.table).build(dialect),
            build_insert_version(&self.table, version)?.build(dialect),
        ];
        for sql in &statements {
            if let Err(err) = tx.execute(sql).await {
                if let Err(rollback) = tx.rollback().await {
                    warn!(
                        connection,
                        version,
                        error = %rollback,
                        "rollback after failed version write"
                    );
                }
                return Err(err);
            }
        }
        tx.commit().await?;
        debug!(connection, version, "stored version");
        Ok(())
    }
}
