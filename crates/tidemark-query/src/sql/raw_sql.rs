use super::types::{BuiltQuery, RawSql};

pub fn build_raw_sql(sql: String) -> BuiltQuery {
    BuiltQuery::Raw(RawSql::uniform(sql))
}
