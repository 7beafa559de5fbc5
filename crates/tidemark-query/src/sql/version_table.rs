//! Statements over the single-value table holding a connection's applied
//! version.

use sea_query::{Alias, ColumnDef, Query, Table};

use super::types::BuiltQuery;
use crate::error::QueryError;

pub const VERSION_COLUMN: &str = "version";

pub fn build_create_version_table(table: &str) -> BuiltQuery {
    let stmt = Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(ColumnDef::new(Alias::new(VERSION_COLUMN)).big_integer().not_null())
        .to_owned();
    BuiltQuery::CreateTable(Box::new(stmt))
}

pub fn build_select_version(table: &str) -> BuiltQuery {
    let stmt = Query::select()
        .column(Alias::new(VERSION_COLUMN))
        .from(Alias::new(table))
        .limit(1)
        .to_owned();
    BuiltQuery::Select(Box::new(stmt))
}

pub fn build_clear_version(table: &str) -> BuiltQuery {
    let stmt = Query::delete().from_table(Alias::new(table)).to_owned();
    BuiltQuery::Delete(Box::new(stmt))
}

pub fn build_insert_version(table: &str, version: u32) -> Result<BuiltQuery, QueryError> {
    let stmt = Query::insert()
        .into_table(Alias::new(table))
        .columns([Alias::new(VERSION_COLUMN)])
        .values([i64::from(version).into()])
        .map_err(|e| QueryError::Other(e.to_string()))?
        .to_owned();
    Ok(BuiltQuery::Insert(Box::new(stmt)))
}
