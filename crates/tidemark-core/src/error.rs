use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::direction::Version;
use crate::step::{HookKind, StepError};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("could not find step {version} for connection '{connection}'")]
    StepNotFound { connection: String, version: Version },
    #[error("invalid change type: {0}")]
    UnknownChangeType(String),
    #[error("step {version} ({name}) failed in {hook} hook: {source}")]
    StepExecution {
        version: Version,
        name: String,
        hook: HookKind,
        #[source]
        source: StepError,
    },
    #[error("change '{change_type}' failed: {message}")]
    ChangeFailed {
        change_type: String,
        message: String,
    },
    #[error("database error: {0}")]
    Database(String),
}

/// Where in a `migrate` run a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolve,
    Hook(HookKind),
    Change,
    VersionStore,
    Transaction,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Resolve => f.write_str("resolve"),
            Phase::Hook(kind) => write!(f, "{kind} hook"),
            Phase::Change => f.write_str("change"),
            Phase::VersionStore => f.write_str("version store"),
            Phase::Transaction => f.write_str("transaction"),
        }
    }
}

#[derive(Debug)]
pub struct ErrorRecord {
    pub phase: Phase,
    /// Step being executed when the failure happened, if any.
    pub version: Option<Version>,
    pub error: MigrationError,
}

impl ErrorRecord {
    pub fn new(phase: Phase, version: Option<Version>, error: MigrationError) -> Self {
        Self {
            phase,
            version,
            error,
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(version) => write!(f, "[{} @ step {}] {}", self.phase, version, self.error),
            None => write!(f, "[{}] {}", self.phase, self.error),
        }
    }
}

/// Failures collected during a single `migrate` call.
#[derive(Debug, Clone, Default)]
pub struct ErrorList {
    records: Vec<Arc<ErrorRecord>>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ErrorRecord) {
        self.records.push(Arc::new(record));
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter().map(|r| r.as_ref())
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, " - {record}")?;
        }
        Ok(())
    }
}
