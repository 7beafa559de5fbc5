use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend as DbBackend, DatabaseConnection,
    DatabaseTransaction, Statement, TransactionTrait,
};
use tidemark_config::TidemarkConfig;
use tidemark_query::DatabaseBackend;
use tracing::debug;

use super::{Backend, Transaction};
use crate::error::DatabaseError;

fn dialect(db: DbBackend) -> Result<DatabaseBackend, DatabaseError> {
    match db {
        DbBackend::Postgres => Ok(DatabaseBackend::Postgres),
        DbBackend::MySql => Ok(DatabaseBackend::MySql),
        DbBackend::Sqlite => Ok(DatabaseBackend::Sqlite),
        #[allow(unreachable_patterns)]
        other => Err(DatabaseError::UnsupportedBackend(format!("{other:?}"))),
    }
}

/// [`Backend`] over sea-orm connections, one per connection name.
#[derive(Default)]
pub struct SeaOrmBackend {
    connections: HashMap<String, DatabaseConnection>,
}

impl fmt::Debug for SeaOrmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeaOrmBackend")
            .field("connections", &self.connections.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SeaOrmBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an already opened connection for `name`.
    pub fn with_connection(mut self, name: impl Into<String>, conn: DatabaseConnection) -> Self {
        self.connections.insert(name.into(), conn);
        self
    }

    /// Open every named connection using the URLs in `config`.
    pub async fn connect<'a>(
        config: &TidemarkConfig,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, DatabaseError> {
        let mut backend = Self::new();
        for name in names {
            let url = config
                .connection_url(name)
                .ok_or_else(|| DatabaseError::UnknownConnection(name.to_string()))?;
            let mut opt = ConnectOptions::new(url.to_string());
            opt.connect_timeout(Duration::from_secs(8))
                .acquire_timeout(Duration::from_secs(8))
                .sqlx_logging(false);
            debug!(connection = name, "connecting");
            let conn = Database::connect(opt).await?;
            backend.connections.insert(name.to_string(), conn);
        }
        Ok(backend)
    }
}

#[async_trait]
impl Backend for SeaOrmBackend {
    async fn begin(&self, connection: &str) -> Result<Box<dyn Transaction>, DatabaseError> {
        let conn = self
            .connections
            .get(connection)
            .ok_or_else(|| DatabaseError::UnknownConnection(connection.to_string()))?;
        let backend = dialect(conn.get_database_backend())?;
        let tx = conn.begin().await?;
        Ok(Box::new(SeaOrmTransaction { tx, backend }))
    }
}

struct SeaOrmTransaction {
    tx: DatabaseTransaction,
    backend: DatabaseBackend,
}

#[async_trait]
impl Transaction for SeaOrmTransaction {
    fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    async fn execute(&mut self, sql: &str) -> Result<(), DatabaseError> {
        self.tx.execute_unprepared(sql).await?;
        Ok(())
    }

    async fn query_i64(&mut self, sql: &str) -> Result<Option<i64>, DatabaseError> {
        let stmt = Statement::from_string(self.tx.get_database_backend(), sql);
        let row = self.tx.query_one_raw(stmt).await?;
        match row {
            Some(row) => Ok(Some(row.try_get_by_index::<i64>(0)?)),
            None => Ok(None),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
