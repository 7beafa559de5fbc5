use sea_query::{Alias, ForeignKey};

use tidemark_core::action::CreateForeignKey;
use tidemark_core::action::types::CREATE_FOREIGN_KEY;

use super::helpers::to_sea_fk_action;
use super::types::{BuiltQuery, DatabaseBackend};
use crate::error::QueryError;

pub fn build_create_foreign_key(
    backend: &DatabaseBackend,
    fk: &CreateForeignKey,
) -> Result<BuiltQuery, QueryError> {
    // SQLite only accepts foreign keys in CREATE TABLE.
    if *backend == DatabaseBackend::Sqlite {
        return Err(QueryError::Unsupported {
            change_type: CREATE_FOREIGN_KEY,
            backend: *backend,
        });
    }

    let mut stmt = ForeignKey::create()
        .name(&fk.name)
        .from_tbl(Alias::new(&fk.table))
        .to_tbl(Alias::new(&fk.ref_table))
        .to_owned();
    for col in &fk.columns {
        stmt.from_col(Alias::new(col));
    }
    for col in &fk.ref_columns {
        stmt.to_col(Alias::new(col));
    }
    if let Some(action) = &fk.on_delete {
        stmt.on_delete(to_sea_fk_action(action));
    }
    if let Some(action) = &fk.on_update {
        stmt.on_update(to_sea_fk_action(action));
    }

    Ok(BuiltQuery::CreateForeignKey(Box::new(stmt)))
}
