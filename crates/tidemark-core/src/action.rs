use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::change::{Change, ChangeError};
use crate::schema::{
    ColumnDef, ColumnName, IndexDef, IndexName, ReferenceAction, TableConstraint, TableName,
};

pub mod types {
    pub const CREATE_TABLE: &str = "create_table";
    pub const DROP_TABLE: &str = "drop_table";
    pub const RENAME_TABLE: &str = "rename_table";
    pub const ADD_COLUMN: &str = "add_column";
    pub const REMOVE_COLUMN: &str = "remove_column";
    pub const RENAME_COLUMN: &str = "rename_column";
    pub const CHANGE_COLUMN: &str = "change_column";
    pub const ADD_INDEX: &str = "add_index";
    pub const REMOVE_INDEX: &str = "remove_index";
    pub const CREATE_FOREIGN_KEY: &str = "create_foreign_key";
    pub const DROP_FOREIGN_KEY: &str = "drop_foreign_key";
    pub const RAW_SQL: &str = "raw_sql";
}

/// Typed payload of a built-in change type.
pub trait ChangeAction: Serialize + DeserializeOwned {
    const TYPE: &'static str;
}

macro_rules! change_action {
    ($ty:ident, $tag:expr) => {
        impl ChangeAction for $ty {
            const TYPE: &'static str = $tag;
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTable {
    pub table: TableName,
    pub columns: Vec<ColumnDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<TableConstraint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTable {
    pub table: TableName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameTable {
    pub from: TableName,
    pub to: TableName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddColumn {
    pub table: TableName,
    pub column: ColumnDef,
    /// Optional fill value to backfill existing rows when adding NOT NULL without default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_with: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveColumn {
    pub table: TableName,
    pub column: ColumnName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameColumn {
    pub table: TableName,
    pub from: ColumnName,
    pub to: ColumnName,
}

/// Redefine an existing column (type, nullability, default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeColumn {
    pub table: TableName,
    pub column: ColumnDef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddIndex {
    pub table: TableName,
    pub index: IndexDef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveIndex {
    pub table: TableName,
    pub name: IndexName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateForeignKey {
    pub table: TableName,
    pub name: String,
    pub columns: Vec<ColumnName>,
    pub ref_table: TableName,
    pub ref_columns: Vec<ColumnName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferenceAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferenceAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropForeignKey {
    pub table: TableName,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSql {
    pub sql: String,
    /// Statement that undoes `sql`, used when the change is declared in a
    /// bidirectional hook and replayed on the way down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
}

change_action!(CreateTable, types::CREATE_TABLE);
change_action!(DropTable, types::DROP_TABLE);
change_action!(RenameTable, types::RENAME_TABLE);
change_action!(AddColumn, types::ADD_COLUMN);
change_action!(RemoveColumn, types::REMOVE_COLUMN);
change_action!(RenameColumn, types::RENAME_COLUMN);
change_action!(ChangeColumn, types::CHANGE_COLUMN);
change_action!(AddIndex, types::ADD_INDEX);
change_action!(RemoveIndex, types::REMOVE_INDEX);
change_action!(CreateForeignKey, types::CREATE_FOREIGN_KEY);
change_action!(DropForeignKey, types::DROP_FOREIGN_KEY);
change_action!(RawSql, types::RAW_SQL);

/// The change that undoes `change`.
///
/// Only changes that carry enough information to be undone are invertible;
/// dropping a table or a column loses its definition and is rejected.
pub fn invert(change: &Change) -> Result<Change, ChangeError> {
    match change.change_type.as_str() {
        types::CREATE_TABLE => {
            let create: CreateTable = change.decode()?;
            Change::from_action(&DropTable {
                table: create.table,
            })
        }
        types::RENAME_TABLE => {
            let rename: RenameTable = change.decode()?;
            Change::from_action(&RenameTable {
                from: rename.to,
                to: rename.from,
            })
        }
        types::ADD_COLUMN => {
            let add: AddColumn = change.decode()?;
            Change::from_action(&RemoveColumn {
                table: add.table,
                column: add.column.name,
            })
        }
        types::RENAME_COLUMN => {
            let rename: RenameColumn = change.decode()?;
            Change::from_action(&RenameColumn {
                table: rename.table,
                from: rename.to,
                to: rename.from,
            })
        }
        types::ADD_INDEX => {
            let add: AddIndex = change.decode()?;
            Change::from_action(&RemoveIndex {
                table: add.table,
                name: add.index.name,
            })
        }
        types::CREATE_FOREIGN_KEY => {
            let fk: CreateForeignKey = change.decode()?;
            Change::from_action(&DropForeignKey {
                table: fk.table,
                name: fk.name,
            })
        }
        types::RAW_SQL => {
            let raw: RawSql = change.decode()?;
            match raw.down {
                Some(down) => Change::from_action(&RawSql {
                    sql: down,
                    down: Some(raw.sql),
                }),
                None => Err(ChangeError::Irreversible(types::RAW_SQL.to_string())),
            }
        }
        other => Err(ChangeError::Irreversible(other.to_string())),
    }
}
