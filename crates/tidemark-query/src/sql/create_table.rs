use sea_query::{Alias, ForeignKey, Index, Table, TableCreateStatement};

use tidemark_core::{ColumnDef, TableConstraint};

use super::helpers::{build_sea_column_def, to_sea_fk_action};
use super::types::{BuiltQuery, DatabaseBackend};

fn build_create_table_for_backend(
    backend: &DatabaseBackend,
    table: &str,
    columns: &[ColumnDef],
    constraints: &[TableConstraint],
) -> TableCreateStatement {
    let mut stmt = Table::create().table(Alias::new(table)).to_owned();

    let has_table_primary_key = constraints
        .iter()
        .any(|c| matches!(c, TableConstraint::PrimaryKey { .. }));

    for column in columns {
        let mut col = build_sea_column_def(backend, column);

        if column.primary_key && !has_table_primary_key {
            col.primary_key();
        }
        if column.auto_increment && column.r#type.supports_auto_increment() {
            col.auto_increment();
        }
        if column.unique {
            col.unique_key();
        }

        stmt.col(col);
    }

    for constraint in constraints {
        match constraint {
            TableConstraint::PrimaryKey { columns: pk_cols } => {
                let mut pk_idx = Index::create();
                for c in pk_cols {
                    pk_idx.col(Alias::new(c));
                }
                stmt.primary_key(&mut pk_idx);
            }
            // Emitted as separate unique indexes by `build_create_table`.
            TableConstraint::Unique { .. } => {}
            TableConstraint::ForeignKey {
                name,
                columns: fk_cols,
                ref_table,
                ref_columns,
                on_delete,
                on_update,
            } => {
                let mut fk = ForeignKey::create();
                if let Some(n) = name {
                    fk.name(n);
                }
                fk.from_tbl(Alias::new(table));
                for col in fk_cols {
                    fk.from_col(Alias::new(col));
                }
                fk.to_tbl(Alias::new(ref_table));
                for col in ref_columns {
                    fk.to_col(Alias::new(col));
                }
                if let Some(action) = on_delete {
                    fk.on_delete(to_sea_fk_action(action));
                }
                if let Some(action) = on_update {
                    fk.on_update(to_sea_fk_action(action));
                }
                stmt.foreign_key(&mut fk);
            }
        }
    }

    stmt
}

/// Unique constraints without a name get `uq_<table>_<columns>`.
fn unique_index_name(table: &str, name: Option<&str>, columns: &[String]) -> String {
    match name {
        Some(n) => n.to_string(),
        None => format!("uq_{}_{}", table, columns.join("_")),
    }
}

pub fn build_create_table(
    backend: &DatabaseBackend,
    table: &str,
    columns: &[ColumnDef],
    constraints: &[TableConstraint],
) -> Vec<BuiltQuery> {
    let mut queries = vec![BuiltQuery::CreateTable(Box::new(
        build_create_table_for_backend(backend, table, columns, constraints),
    ))];

    for constraint in constraints {
        if let TableConstraint::Unique { name, columns } = constraint {
            let mut idx = Index::create()
                .name(unique_index_name(table, name.as_deref(), columns))
                .table(Alias::new(table))
                .unique()
                .to_owned();
            for col in columns {
                idx.col(Alias::new(col));
            }
            queries.push(BuiltQuery::CreateIndex(Box::new(idx)));
        }
    }

    queries
}
