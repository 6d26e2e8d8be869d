use rusqlite::types::Value;
use tracing::{debug, info};

use super::{NativeStatement, PreparedQuery, text_argument};
use crate::Result;
use crate::query::{Cell, QueryResult};
use crate::translator::ShowColumnsTranslator;

pub(super) fn prepare(query: &str) -> PreparedQuery {
    let sql = match ShowColumnsTranslator::translate(query) {
        Some(sql) => sql,
        None => {
            info!("Query does not match the expected SHOW COLUMNS form, passing it through: {}", query);
            query.to_string()
        }
    };
    PreparedQuery {
        sql,
        param_count: 1,
        column_count: 1,
    }
}

/// Answers `WHERE Field = ?` by searching the table's CREATE statement for the column.
pub(super) fn execute(statement: &NativeStatement, args: &[Value]) -> Result<QueryResult> {
    let column = text_argument(args, 0)?;

    let create_sql = statement.with_statement(|_, stmt| {
        match stmt.query_row([], |row| row.get::<_, Option<String>>(0)) {
            Ok(sql) => Ok(sql),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    })?;

    let present = create_sql
        .as_deref()
        .is_some_and(|sql| ShowColumnsTranslator::has_column(sql, &column));
    if !present {
        debug!("Column `{}` does not exist", column);
        return Ok(QueryResult::empty());
    }

    debug!("Column `{}` exists", column);
    Ok(QueryResult::simple(&["name"], vec![vec![Cell::Text(column)]], true))
}
