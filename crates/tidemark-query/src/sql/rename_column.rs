use sea_query::{Alias, Table};

use super::types::BuiltQuery;

pub fn build_rename_column(table: &str, from: &str, to: &str) -> BuiltQuery {
    let stmt = Table::alter()
        .table(Alias::new(table))
        .rename_column(Alias::new(from), Alias::new(to))
        .to_owned();
    BuiltQuery::AlterTable(Box::new(stmt))
}
