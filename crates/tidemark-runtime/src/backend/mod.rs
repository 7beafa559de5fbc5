//! Transactional database access used by the engine.

#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod seaorm;

use async_trait::async_trait;
use tidemark_query::DatabaseBackend;

use crate::error::DatabaseError;

#[cfg(any(test, feature = "testing"))]
pub use memory::{MemoryBackend, MemoryEvent};
pub use seaorm::SeaOrmBackend;

/// Opens transactions against named connections.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn begin(&self, connection: &str) -> Result<Box<dyn Transaction>, DatabaseError>;
}

/// An open transaction on one connection.
///
/// `commit` and `rollback` consume the transaction, so it is closed at most
/// once.
#[async_trait]
pub trait Transaction: Send {
    /// SQL dialect of the underlying connection.
    fn backend(&self) -> DatabaseBackend;

    async fn execute(&mut self, sql: &str) -> Result<(), DatabaseError>;

    /// First column of the first row, if any row is returned.
    async fn query_i64(&mut self, sql: &str) -> Result<Option<i64>, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}

