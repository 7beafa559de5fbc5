use sea_query::{Alias, ForeignKey};

use tidemark_core::action::types::DROP_FOREIGN_KEY;

use super::types::{BuiltQuery, DatabaseBackend};
use crate::error::QueryError;

pub fn build_drop_foreign_key(
    backend: &DatabaseBackend,
    table: &str,
    name: &str,
) -> Result<BuiltQuery, QueryError> {
    if *backend == DatabaseBackend::Sqlite {
        return Err(QueryError::Unsupported {
            change_type: DROP_FOREIGN_KEY,
            backend: *backend,
        });
    }

    let stmt = ForeignKey::drop()
        .name(name)
        .table(Alias::new(table))
        .to_owned();
    Ok(BuiltQuery::DropForeignKey(Box::new(stmt)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::postgres(
        DatabaseBackend::Postgres,
        "ALTER TABLE \"orders\" DROP CONSTRAINT \"fk_orders_customer\""
    )]
    #[case::mysql(
        DatabaseBackend::MySql,
        "ALTER TABLE `orders` DROP FOREIGN KEY `fk_orders_customer`"
    )]
    fn test_drop_foreign_key(#[case] backend: DatabaseBackend, #[case] expected: &str) {
        let sql = build_drop_foreign_key(&backend, "orders", "fk_orders_customer")
            .unwrap()
            .build(backend);
        assert!(sql.contains(expected), "Expected SQL to contain '{expected}', got: {sql}");
    }

    #[test]
    fn test_sqlite_is_unsupported() {
        assert!(build_drop_foreign_key(&DatabaseBackend::Sqlite, "orders", "fk").is_err());
    }
}
