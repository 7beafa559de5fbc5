use sea_query::{Alias, Expr, Query, Table, TableAlterStatement};

use tidemark_core::ColumnDef;

use super::helpers::build_sea_column_def;
use super::types::{BuiltQuery, DatabaseBackend};

fn build_add_column_alter_for_backend(
    backend: &DatabaseBackend,
    table: &str,
    column: &ColumnDef,
) -> TableAlterStatement {
    let col_def = build_sea_column_def(backend, column);
    Table::alter()
        .table(Alias::new(table))
        .add_column(col_def)
        .to_owned()
}

/// Add a column, backfilling existing rows with `fill_with` when the column
/// is NOT NULL without a default.
///
/// SQLite cannot alter a column after the fact, so there the fill value
/// becomes the column default instead.
pub fn build_add_column(
    backend: &DatabaseBackend,
    table: &str,
    column: &ColumnDef,
    fill_with: Option<&str>,
) -> Vec<BuiltQuery> {
    let fill = fill_with.filter(|_| !column.nullable && column.default.is_none());

    let Some(fill) = fill else {
        return vec![BuiltQuery::AlterTable(Box::new(
            build_add_column_alter_for_backend(backend, table, column),
        ))];
    };

    if *backend == DatabaseBackend::Sqlite {
        let mut with_default = column.clone();
        with_default.default = Some(fill.to_string());
        return vec![BuiltQuery::AlterTable(Box::new(
            build_add_column_alter_for_backend(backend, table, &with_default),
        ))];
    }

    let mut nullable = column.clone();
    nullable.nullable = true;

    let backfill = Query::update()
        .table(Alias::new(table))
        .value(Alias::new(&column.name), Expr::cust(fill))
        .to_owned();

    let set_not_null = Table::alter()
        .table(Alias::new(table))
        .modify_column(build_sea_column_def(backend, column))
        .to_owned();

    vec![
        BuiltQuery::AlterTable(Box::new(build_add_column_alter_for_backend(
            backend, table, &nullable,
        ))),
        BuiltQuery::Update(Box::new(backfill)),
        BuiltQuery::AlterTable(Box::new(set_not_null)),
    ]
}
