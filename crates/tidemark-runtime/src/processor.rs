use std::collections::HashMap;

use tidemark_core::{Change, ChangeError, MigrationError, invert};
use tidemark_query::{ChangeHandler, DatabaseBackend, builtin_handlers};
use tracing::debug;

use crate::backend::Transaction;

/// Produces the change that undoes a change of the registered type.
pub type ChangeInverter = fn(&Change) -> Result<Change, ChangeError>;

#[derive(Clone, Copy)]
struct Registration {
    handler: ChangeHandler,
    inverse: Option<ChangeInverter>,
}

/// Dispatches changes to handlers by their type tag.
///
/// A type registered with an inverse can also be declared in a generic
/// `migrate` hook and walked down.
#[derive(Clone)]
pub struct ChangeProcessor {
    handlers: HashMap<String, Registration>,
}

impl Default for ChangeProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("ChangeProcessor")
            .field("handlers", &types)
            .finish()
    }
}

impl ChangeProcessor {
    /// Processor with every built-in change type registered.
    pub fn new() -> Self {
        let mut processor = Self::empty();
        for (change_type, handler) in builtin_handlers() {
            processor.register_with_inverse(change_type, handler, invert);
        }
        processor
    }

    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `change_type`, returning the handler it replaces.
    ///
    /// Changes of this type cannot be walked down from a `migrate` hook.
    pub fn register(
        &mut self,
        change_type: impl Into<String>,
        handler: ChangeHandler,
    ) -> Option<ChangeHandler> {
        let registration = Registration {
            handler,
            inverse: None,
        };
        self.insert(change_type.into(), registration)
    }

    /// Register `handler` together with the `inverse` used when a `migrate`
    /// hook declaring this type is walked down.
    pub fn register_with_inverse(
        &mut self,
        change_type: impl Into<String>,
        handler: ChangeHandler,
        inverse: ChangeInverter,
    ) -> Option<ChangeHandler> {
        let registration = Registration {
            handler,
            inverse: Some(inverse),
        };
        self.insert(change_type.into(), registration)
    }

    fn insert(
        &mut self,
        change_type: String,
        registration: Registration,
    ) -> Option<ChangeHandler> {
        self.handlers
            .insert(change_type, registration)
            .map(|previous| previous.handler)
    }

    fn registration(&self, change: &Change) -> Result<&Registration, MigrationError> {
        self.handlers
            .get(&change.change_type)
            .ok_or_else(|| MigrationError::UnknownChangeType(change.change_type.clone()))
    }

    pub fn handles(&self, change_type: &str) -> bool {
        self.handlers.contains_key(change_type)
    }

    /// SQL statements `change` expands to on `backend`.
    pub fn render(
        &self,
        backend: DatabaseBackend,
        change: &Change,
    ) -> Result<Vec<String>, MigrationError> {
        let handler = self.registration(change)?.handler;
        let queries = handler(&backend, change).map_err(|e| MigrationError::ChangeFailed {
            change_type: change.change_type.clone(),
            message: e.to_string(),
        })?;
        Ok(queries.iter().map(|q| q.build(backend)).collect())
    }

    /// Apply one change inside `tx`.
    pub async fn apply(
        &self,
        tx: &mut dyn Transaction,
        change: &Change,
    ) -> Result<(), MigrationError> {
        for sql in self.render(tx.backend(), change)? {
            debug!(change_type = %change.change_type, %sql, "executing");
            tx.execute(&sql)
                .await
                .map_err(|e| MigrationError::ChangeFailed {
                    change_type: change.change_type.clone(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// The change that undoes `change`.
    pub fn invert(&self, change: &Change) -> Result<Change, MigrationError> {
        let change_type = &change.change_type;
        let inverse = self.registration(change)?.inverse.ok_or_else(|| {
            MigrationError::ChangeFailed {
                change_type: change_type.clone(),
                message: ChangeError::Irreversible(change_type.clone()).to_string(),
            }
        })?;
        inverse(change).map_err(|e| MigrationError::ChangeFailed {
            change_type: change_type.clone(),
            message: e.to_string(),
        })
    }

    /// Apply the inverse of `change` inside `tx`.
    pub async fn apply_inverse(
        &self,
        tx: &mut dyn Transaction,
        change: &Change,
    ) -> Result<(), MigrationError> {
        let inverse = self.invert(change)?;
        self.apply(tx, &inverse).await
    }
}
