use serde::{Deserialize, Serialize};

use crate::schema::{ColumnName, IndexName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDef {
    pub name: IndexName,
    pub columns: Vec<ColumnName>,
    #[serde(default)]
    pub unique: bool,
}
