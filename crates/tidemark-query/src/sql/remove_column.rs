use sea_query::{Alias, Table};

use super::types::BuiltQuery;

pub fn build_remove_column(table: &str, column: &str) -> BuiltQuery {
    let stmt = Table::alter()
        .table(Alias::new(table))
        .drop_column(Alias::new(column))
        .to_owned();
    BuiltQuery::AlterTable(Box::new(stmt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::types::DatabaseBackend;
    use rstest::rstest;

    #[rstest]
    #[case::postgres(DatabaseBackend::Postgres, "ALTER TABLE \"customers\" DROP COLUMN \"email\"")]
    #[case::mysql(DatabaseBackend::MySql, "ALTER TABLE `customers` DROP COLUMN `email`")]
    #[case::sqlite(DatabaseBackend::Sqlite, "ALTER TABLE \"customers\" DROP COLUMN \"email\"")]
    fn test_remove_column(#[case] backend: DatabaseBackend, #[case] expected: &str) {
        let sql = build_remove_column("customers", "email").build(backend);
        assert!(sql.contains(expected), "Expected SQL to contain '{expected}', got: {sql}");
    }
}
