use thiserror::Error;
use tidemark_core::ChangeError;

use crate::sql::DatabaseBackend;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Payload(#[from] ChangeError),
    #[error("invalid change type: {0}")]
    UnknownChangeType(String),
    #[error("'{change_type}' is not supported on {backend}")]
    Unsupported {
        change_type: &'static str,
        backend: DatabaseBackend,
    },
    #[error("{0}")]
    Other(String),
}
