use sea_query::{Alias, Table};

use tidemark_core::ColumnDef;
use tidemark_core::action::types::CHANGE_COLUMN;

use super::helpers::build_sea_column_def;
use super::types::{BuiltQuery, DatabaseBackend};
use crate::error::QueryError;

/// Redefine type, nullability and default of an existing column.
pub fn build_change_column(
    backend: &DatabaseBackend,
    table: &str,
    column: &ColumnDef,
) -> Result<BuiltQuery, QueryError> {
    // SQLite has no ALTER COLUMN; redefining needs a table rebuild.
    if *backend == DatabaseBackend::Sqlite {
        return Err(QueryError::Unsupported {
            change_type: CHANGE_COLUMN,
            backend: *backend,
        });
    }

    let mut col = build_sea_column_def(backend, column);
    if column.nullable {
        col.null();
    }

    let stmt = Table::alter()
        .table(Alias::new(table))
        .modify_column(col)
        .to_owned();
    Ok(BuiltQuery::AlterTable(Box::new(stmt)))
}
