use std::fmt;

use super::helpers::{build_query_statement, build_schema_statement};

/// Database backend for SQL generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    MySql,
    Sqlite,
}

impl DatabaseBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseBackend::Postgres => "postgres",
            DatabaseBackend::MySql => "mysql",
            DatabaseBackend::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A built statement that renders to SQL for a database backend.
///
/// Handlers check backend support while building, so a query should be
/// rendered for the backend it was built for.
#[derive(Debug, Clone)]
pub enum BuiltQuery {
    CreateTable(Box<sea_query::TableCreateStatement>),
    DropTable(Box<sea_query::TableDropStatement>),
    AlterTable(Box<sea_query::TableAlterStatement>),
    CreateIndex(Box<sea_query::IndexCreateStatement>),
    DropIndex(Box<sea_query::IndexDropStatement>),
    RenameTable(Box<sea_query::TableRenameStatement>),
    CreateForeignKey(Box<sea_query::ForeignKeyCreateStatement>),
    DropForeignKey(Box<sea_query::ForeignKeyDropStatement>),
    Select(Box<sea_query::SelectStatement>),
    Insert(Box<sea_query::InsertStatement>),
    Update(Box<sea_query::UpdateStatement>),
    Delete(Box<sea_query::DeleteStatement>),
    Raw(RawSql),
}

/// Raw SQL that may have backend-specific variants
#[derive(Debug, Clone)]
pub struct RawSql {
    pub postgres: String,
    pub mysql: String,
    pub sqlite: String,
}

impl RawSql {
    /// Create a RawSql with the same SQL for all backends
    pub fn uniform(sql: String) -> Self {
        Self {
            postgres: sql.clone(),
            mysql: sql.clone(),
            sqlite: sql,
        }
    }

    /// Create a RawSql with different SQL for each backend
    pub fn per_backend(postgres: String, mysql: String, sqlite: String) -> Self {
        Self {
            postgres,
            mysql,
            sqlite,
        }
    }
}

impl BuiltQuery {
    /// Build SQL string for the specified database backend
    pub fn build(&self, backend: DatabaseBackend) -> String {
        match self {
            BuiltQuery::CreateTable(stmt) => build_schema_statement(stmt.as_ref(), backend),
            BuiltQuery::DropTable(stmt) => build_schema_statement(stmt.as_ref(), backend),
            BuiltQuery::AlterTable(stmt) => build_schema_statement(stmt.as_ref(), backend),
            BuiltQuery::CreateIndex(stmt) => build_schema_statement(stmt.as_ref(), backend),
            BuiltQuery::DropIndex(stmt) => build_schema_statement(stmt.as_ref(), backend),
            BuiltQuery::RenameTable(stmt) => build_schema_statement(stmt.as_ref(), backend),
            BuiltQuery::CreateForeignKey(stmt) => build_schema_statement(stmt.as_ref(), backend),
            BuiltQuery::DropForeignKey(stmt) => build_schema_statement(stmt.as_ref(), backend),
            BuiltQuery::Select(stmt) => build_query_statement(stmt.as_ref(), backend),
            BuiltQuery::Insert(stmt) => build_query_statement(stmt.as_ref(), backend),
            BuiltQuery::Update(stmt) => build_query_statement(stmt.as_ref(), backend),
            BuiltQuery::Delete(stmt) => build_query_statement(stmt.as_ref(), backend),
            BuiltQuery::Raw(raw) => match backend {
                DatabaseBackend::Postgres => raw.postgres.clone(),
                DatabaseBackend::MySql => raw.mysql.clone(),
                DatabaseBackend::Sqlite => raw.sqlite.clone(),
            },
        }
    }
}
