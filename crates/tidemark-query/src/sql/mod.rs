pub mod add_column;
pub mod add_index;
pub mod change_column;
pub mod create_foreign_key;
pub mod create_table;
pub mod drop_foreign_key;
pub mod drop_table;
pub mod helpers;
pub mod raw_sql;
pub mod remove_column;
pub mod remove_index;
pub mod rename_column;
pub mod rename_table;
pub mod types;
pub mod version_table;

pub use helpers::*;
pub use types::{BuiltQuery, DatabaseBackend, RawSql};

use tidemark_core::Change;
use tidemark_core::action::{
    AddColumn, AddIndex, ChangeAction, ChangeColumn, CreateForeignKey, CreateTable,
    DropForeignKey, DropTable, RawSql as RawSqlAction, RemoveColumn, RemoveIndex, RenameColumn,
    RenameTable,
};

use crate::error::QueryError;

use self::{
    add_column::build_add_column, add_index::build_add_index,
    change_column::build_change_column, create_foreign_key::build_create_foreign_key,
    create_table::build_create_table, drop_foreign_key::build_drop_foreign_key,
    drop_table::build_drop_table, raw_sql::build_raw_sql, remove_column::build_remove_column,
    remove_index::build_remove_index, rename_column::build_rename_column,
    rename_table::build_rename_table,
};

/// Turns one change into the statements that apply it.
pub type ChangeHandler = fn(&DatabaseBackend, &Change) -> Result<Vec<BuiltQuery>, QueryError>;

fn create_table(backend: &DatabaseBackend, change: &Change) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: CreateTable = change.decode()?;
    Ok(build_create_table(
        backend,
        &action.table,
        &action.columns,
        &action.constraints,
    ))
}

fn drop_table(_: &DatabaseBackend, change: &Change) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: DropTable = change.decode()?;
    Ok(vec![build_drop_table(&action.table)])
}

fn rename_table(_: &DatabaseBackend, change: &Change) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: RenameTable = change.decode()?;
    Ok(vec![build_rename_table(&action.from, &action.to)])
}

fn add_column(backend: &DatabaseBackend, change: &Change) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: AddColumn = change.decode()?;
    Ok(build_add_column(
        backend,
        &action.table,
        &action.column,
        action.fill_with.as_deref(),
    ))
}

fn remove_column(_: &DatabaseBackend, change: &Change) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: RemoveColumn = change.decode()?;
    Ok(vec![build_remove_column(&action.table, &action.column)])
}

fn rename_column(_: &DatabaseBackend, change: &Change) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: RenameColumn = change.decode()?;
    Ok(vec![build_rename_column(
        &action.table,
        &action.from,
        &action.to,
    )])
}

fn change_column(
    backend: &DatabaseBackend,
    change: &Change,
) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: ChangeColumn = change.decode()?;
    Ok(vec![build_change_column(
        backend,
        &action.table,
        &action.column,
    )?])
}

fn add_index(_: &DatabaseBackend, change: &Change) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: AddIndex = change.decode()?;
    Ok(vec![build_add_index(&action.table, &action.index)])
}

fn remove_index(_: &DatabaseBackend, change: &Change) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: RemoveIndex = change.decode()?;
    Ok(vec![build_remove_index(&action.table, &action.name)])
}

fn create_foreign_key(
    backend: &DatabaseBackend,
    change: &Change,
) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: CreateForeignKey = change.decode()?;
    Ok(vec![build_create_foreign_key(backend, &action)?])
}

fn drop_foreign_key(
    backend: &DatabaseBackend,
    change: &Change,
) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: DropForeignKey = change.decode()?;
    Ok(vec![build_drop_foreign_key(
        backend,
        &action.table,
        &action.name,
    )?])
}

fn raw_sql(_: &DatabaseBackend, change: &Change) -> Result<Vec<BuiltQuery>, QueryError> {
    let action: RawSqlAction = change.decode()?;
    Ok(vec![build_raw_sql(action.sql)])
}

/// Handlers for every built-in change type, keyed by type tag.
pub fn builtin_handlers() -> Vec<(&'static str, ChangeHandler)> {
    vec![
        (CreateTable::TYPE, create_table as ChangeHandler),
        (DropTable::TYPE, drop_table as ChangeHandler),
        (RenameTable::TYPE, rename_table as ChangeHandler),
        (AddColumn::TYPE, add_column as ChangeHandler),
        (RemoveColumn::TYPE, remove_column as ChangeHandler),
        (RenameColumn::TYPE, rename_column as ChangeHandler),
        (ChangeColumn::TYPE, change_column as ChangeHandler),
        (AddIndex::TYPE, add_index as ChangeHandler),
        (RemoveIndex::TYPE, remove_index as ChangeHandler),
        (CreateForeignKey::TYPE, create_foreign_key as ChangeHandler),
        (DropForeignKey::TYPE, drop_foreign_key as ChangeHandler),
        (RawSqlAction::TYPE, raw_sql as ChangeHandler),
    ]
}

/// Build the statements for a change using the built-in handlers.
pub fn build_change_queries(
    backend: &DatabaseBackend,
    change: &Change,
) -> Result<Vec<BuiltQuery>, QueryError> {
    let handler = builtin_handlers()
        .into_iter()
        .find(|(tag, _)| *tag == change.change_type)
        .map(|(_, handler)| handler)
        .ok_or_else(|| QueryError::UnknownChangeType(change.change_type.clone()))?;
    handler(backend, change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn change(value: serde_json::Value) -> Change {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_every_builtin_type_has_one_handler() {
        let handlers = builtin_handlers();
        let mut tags: Vec<&str> = handlers.iter().map(|(tag, _)| *tag).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), handlers.len());
        assert_eq!(tags.len(), 12);
    }

    #[rstest]
    #[case::create_table(
        json!({"type": "create_table", "table": "customers", "columns": [{"name": "id", "type": "integer"}]}),
        "CREATE TABLE \"customers\""
    )]
    #[case::add_column(
        json!({"type": "add_column", "table": "customers", "column": {"name": "email", "type": "text"}}),
        "ALTER TABLE \"customers\" ADD COLUMN \"email\" text"
    )]
    #[case::rename_table(
        json!({"type": "rename_table", "from": "customers", "to": "clients"}),
        "ALTER TABLE \"customers\" RENAME TO \"clients\""
    )]
    #[case::add_index(
        json!({"type": "add_index", "table": "customers", "index": {"name": "idx_email", "columns": ["email"]}}),
        "CREATE INDEX \"idx_email\""
    )]
    #[case::raw_sql(
        json!({"type": "raw_sql", "sql": "SELECT 1", "down": "SELECT 2"}),
        "SELECT 1"
    )]
    fn test_dispatches_by_type(#[case] value: serde_json::Value, #[case] expected: &str) {
        let queries = build_change_queries(&DatabaseBackend::Postgres, &change(value)).unwrap();
        let sql = queries[0].build(DatabaseBackend::Postgres);
        assert!(sql.contains(expected), "Expected SQL to contain '{expected}', got: {sql}");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = build_change_queries(
            &DatabaseBackend::Postgres,
            &change(json!({"type": "explode_table"})),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::UnknownChangeType(ref t) if t == "explode_table"));
    }

    #[test]
    fn test_malformed_payload_is_a_payload_error() {
        let err = build_change_queries(
            &DatabaseBackend::Postgres,
            &change(json!({"type": "drop_table"})),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Payload(_)));
    }
}
