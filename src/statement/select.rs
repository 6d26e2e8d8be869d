use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracing::error;

use super::{NativeStatement, PreparedQuery, count_placeholders};
use crate::Result;
use crate::query::{QueryResult, ResultBuilder};

/// Column count placeholder; clients must not rely on it matching the projection.
const ADVISORY_COLUMN_COUNT: usize = 2;

pub(super) fn prepare(query: &str) -> PreparedQuery {
    PreparedQuery {
        sql: query.to_string(),
        param_count: count_placeholders(query),
        column_count: ADVISORY_COLUMN_COUNT,
    }
}

pub(super) fn execute(statement: &NativeStatement, args: &[Value]) -> Result<QueryResult> {
    statement
        .with_statement(|_, stmt| ResultBuilder::query(stmt, params_from_iter(args.iter()), true))
        .map_err(|e| {
            error!("Error while querying statement {}: {}", statement.sql(), e);
            e
        })
}
