use sea_query::{Alias, Index};

use tidemark_core::IndexDef;

use super::types::BuiltQuery;

pub fn build_add_index(table: &str, index: &IndexDef) -> BuiltQuery {
    let mut stmt = Index::create()
        .name(&index.name)
        .table(Alias::new(table))
        .to_owned();

    for col in &index.columns {
        stmt.col(Alias::new(col));
    }

    if index.unique {
        stmt.unique();
    }

    BuiltQuery::CreateIndex(Box::new(stmt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::types::DatabaseBackend;
    use rstest::rstest;

    fn index(unique: bool) -> IndexDef {
        IndexDef {
            name: "idx_customers_email".into(),
            columns: vec!["email".into()],
            unique,
        }
    }

    #[rstest]
    #[case::postgres(
        DatabaseBackend::Postgres,
        false,
        "CREATE INDEX \"idx_customers_email\" ON \"customers\" (\"email\")"
    )]
    #[case::mysql(
        DatabaseBackend::MySql,
        false,
        "CREATE INDEX `idx_customers_email` ON `customers` (`email`)"
    )]
    #[case::sqlite_unique(
        DatabaseBackend::Sqlite,
        true,
        "CREATE UNIQUE INDEX \"idx_customers_email\" ON \"customers\" (\"email\")"
    )]
    fn test_add_index(
        #[case] backend: DatabaseBackend,
        #[case] unique: bool,
        #[case] expected: &str,
    ) {
        let sql = build_add_index("customers", &index(unique)).build(backend);
        assert!(sql.contains(expected), "Expected SQL to contain '{expected}', got: {sql}");
    }
}
