use sea_query::{Alias, Table};

use super::types::BuiltQuery;

pub fn build_rename_table(from: &str, to: &str) -> BuiltQuery {
    let stmt = Table::rename()
        .table(Alias::new(from), Alias::new(to))
        .to_owned();
    BuiltQuery::RenameTable(Box::new(stmt))
}
