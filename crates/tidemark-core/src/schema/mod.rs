pub mod column;
pub mod constraint;
pub mod index;
pub mod reference;

pub use column::{ColumnDef, ColumnType, ComplexColumnType, SimpleColumnType};
pub use constraint::TableConstraint;
pub use index::IndexDef;
pub use reference::ReferenceAction;

pub type TableName = String;
pub type ColumnName = String;
pub type IndexName = String;
