use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracing::{debug, error};

use super::{NativeStatement, PreparedQuery, count_placeholders};
use crate::Result;
use crate::query::QueryResult;

pub(super) fn prepare(query: &str) -> PreparedQuery {
    PreparedQuery {
        sql: query.to_string(),
        param_count: count_placeholders(query),
        column_count: 0,
    }
}

/// Runs the statement for its effect. Rows it happens to produce
/// (`PRAGMA`, `WITH ... SELECT`, `VALUES`) are stepped through and dropped.
pub(super) fn execute(statement: &NativeStatement, args: &[Value]) -> Result<QueryResult> {
    statement
        .with_statement(|conn, stmt| {
            if stmt.column_count() == 0 {
                let affected = stmt.execute(params_from_iter(args.iter()))?;
                return Ok(QueryResult::exec(conn.last_insert_rowid(), affected));
            }

            let mut rows = stmt.query(params_from_iter(args.iter()))?;
            let mut discarded = 0usize;
            while rows.next()?.is_some() {
                discarded += 1;
            }
            debug!("Discarded {} rows from {}", discarded, statement.sql());
            Ok(QueryResult::exec(conn.last_insert_rowid(), conn.changes() as usize))
        })
        .map_err(|e| {
            error!("Error while executing statement {}: {}", statement.sql(), e);
            e
        })
}
