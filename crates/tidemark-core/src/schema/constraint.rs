use serde::{Deserialize, Serialize};

use crate::schema::{ColumnName, ReferenceAction, TableName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", rename_all_fields = "camelCase", tag = "type")]
pub enum TableConstraint {
    PrimaryKey {
        columns: Vec<ColumnName>,
    },
    Unique {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        columns: Vec<ColumnName>,
    },
    ForeignKey {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        columns: Vec<ColumnName>,
        ref_table: TableName,
        ref_columns: Vec<ColumnName>,
        #[serde(default)]
        on_delete: Option<ReferenceAction>,
        #[serde(default)]
        on_update: Option<ReferenceAction>,
    },
}
