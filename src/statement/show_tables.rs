use rusqlite::types::Value;
use tracing::error;

use super::{NativeStatement, PreparedQuery, text_argument};
use crate::Result;
use crate::query::{QueryResult, ResultBuilder};

const TABLE_LOOKUP: &str = "SELECT name FROM sqlite_master WHERE type='table' AND name = ?";

/// `SHOW TABLES LIKE ?` becomes an exact lookup in sqlite_master.
pub(super) fn prepare(_query: &str) -> PreparedQuery {
    PreparedQuery {
        sql: TABLE_LOOKUP.to_string(),
        param_count: 1,
        column_count: 1,
    }
}

pub(super) fn execute(statement: &NativeStatement, args: &[Value]) -> Result<QueryResult> {
    let table = text_argument(args, 0)?;
    statement
        .with_statement(|_, stmt| ResultBuilder::query(stmt, [table.as_str()], true))
        .map_err(|e| {
            error!("Error while looking up table {}: {}", table, e);
            e
        })
}
