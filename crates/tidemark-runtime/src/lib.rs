pub mod backend;
pub mod engine;
pub mod error;
pub mod processor;
pub mod version_store;

#[cfg(any(test, feature = "testing"))]
pub use backend::{MemoryBackend, MemoryEvent};
pub use backend::{Backend, SeaOrmBackend, Transaction};
pub use engine::{MigrationEngine, MigrationOptions, Outcome, run_migrations};
pub use error::{DatabaseError, MigrateError};
pub use processor::{ChangeInverter, ChangeProcessor};
pub use version_store::VersionStore;
