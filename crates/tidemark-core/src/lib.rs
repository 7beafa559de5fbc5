pub mod action;
pub mod change;
pub mod direction;
pub mod error;
pub mod schema;
pub mod step;

pub use action::{ChangeAction, invert};
pub use change::{Change, ChangeError, ChangeSet};
pub use direction::{Direction, Version, step_path};
pub use error::{ErrorList, ErrorRecord, MigrationError, Phase};
pub use schema::{
    ColumnDef, ColumnName, ColumnType, ComplexColumnType, IndexDef, IndexName, ReferenceAction,
    SimpleColumnType, TableConstraint, TableName,
};
pub use step::{HookKind, HookSet, Step, StepError};
