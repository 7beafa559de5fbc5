use sea_query::{Alias, Index};

use super::types::BuiltQuery;

pub fn build_remove_index(table: &str, name: &str) -> BuiltQuery {
    let stmt = Index::drop()
        .name(name)
        .table(Alias::new(table))
        .to_owned();
    BuiltQuery::DropIndex(Box::new(stmt))
}
