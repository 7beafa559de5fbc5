pub mod error;
pub mod sql;

pub use error::QueryError;
pub use sql::version_table::{
    VERSION_COLUMN, build_clear_version, build_create_version_table, build_insert_version,
    build_select_version,
};
pub use sql::{BuiltQuery, ChangeHandler, DatabaseBackend, build_change_queries, builtin_handlers};
