use thiserror::Error;
use tidemark_core::{ErrorList, MigrationError};
use tidemark_query::QueryError;

/// Failure reported by a database backend.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("no database configured for connection '{0}'")]
    UnknownConnection(String),
    #[error("unsupported database backend: {0}")]
    UnsupportedBackend(String),
    #[error("stored version {0} is out of range")]
    InvalidVersion(i64),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("{0}")]
    Driver(String),
}

impl From<sea_orm::DbErr> for DatabaseError {
    fn from(err: sea_orm::DbErr) -> Self {
        DatabaseError::Driver(err.to_string())
    }
}

impl From<DatabaseError> for MigrationError {
    fn from(err: DatabaseError) -> Self {
        MigrationError::Database(err.to_string())
    }
}

/// A non-dry-run `migrate` that recorded at least one error.
///
/// The stored version is always unchanged. Step changes have been rolled back,
/// except when the only errors are [`Phase::VersionStore`] records from writing
/// the new version: the step changes were already committed at that point.
///
/// [`Phase::VersionStore`]: tidemark_core::Phase::VersionStore
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("migrating connection '{connection}' failed:\n{errors}")]
    Aggregate { connection: String, errors: ErrorList },
}

impl MigrateError {
    pub fn errors(&self) -> &ErrorList {
        match self {
            MigrateError::Aggregate { errors, .. } => errors,
        }
    }
}
