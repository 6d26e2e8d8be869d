// Prepared statement handlers, one variant per preparable query type
mod exec;
mod select;
mod show_columns;
mod show_tables;

use rusqlite::types::Value;
use rusqlite::{Connection, Statement};

use crate::query::{QueryResult, QueryType};
use crate::session::SharedConnection;
use crate::{MySqliteError, Result};

/// Text to prepare plus the metadata reported to the client at prepare time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    pub sql: String,
    pub param_count: usize,
    /// Advisory only for SELECT, where it does not reflect the projection.
    pub column_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Exec,
    Select,
    ShowTables,
    ShowColumns,
}

impl StatementKind {
    pub fn for_query_type(query_type: QueryType) -> Self {
        match query_type {
            QueryType::Select => StatementKind::Select,
            QueryType::ShowTables => StatementKind::ShowTables,
            QueryType::ShowColumns => StatementKind::ShowColumns,
            // Insert / Update / Delete, DDL, and anything unrecognized run verbatim
            _ => StatementKind::Exec,
        }
    }
}

/// A compiled statement living in its connection's prepared statement cache.
///
/// `rusqlite::Statement` borrows its connection, which is shared behind a
/// lock, so the handle keeps the SQL and checks the compiled statement out
/// of the cache for every execution.
pub struct NativeStatement {
    sql: String,
    connection: SharedConnection,
}

impl NativeStatement {
    /// Compile `sql` on `connection`; engine errors surface here.
    pub fn bind(connection: &SharedConnection, sql: &str) -> Result<Self> {
        {
            let conn = connection.lock();
            conn.prepare_cached(sql)?;
        }
        Ok(Self {
            sql: sql.to_string(),
            connection: connection.clone(),
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    fn with_statement<R>(&self, f: impl FnOnce(&Connection, &mut Statement<'_>) -> Result<R>) -> Result<R> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare_cached(&self.sql)?;
        f(&conn, &mut stmt)
    }

    /// Finalize the compiled statement instead of returning it to the cache.
    pub fn close(self) -> Result<()> {
        let conn = self.connection.lock();
        // A cache miss means the cache already finalized the old statement;
        // the fresh compile is discarded at once. Nothing to release if it
        // no longer compiles (e.g. its table was dropped).
        if let Ok(stmt) = conn.prepare_cached(&self.sql) {
            stmt.discard();
        }
        Ok(())
    }
}

/// Owns one native statement plus the rewrite and execution rules of its kind.
pub struct StatementHandler {
    query_type: QueryType,
    kind: StatementKind,
    query: String,
    statement: Option<NativeStatement>,
}

impl StatementHandler {
    pub fn new(query_type: QueryType) -> Self {
        Self {
            query_type,
            kind: StatementKind::for_query_type(query_type),
            query: String::new(),
            statement: None,
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    /// The query text as the client sent it.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Rewrite `query` for SQLite. Does not touch the engine.
    pub fn prepare(&mut self, query: &str) -> PreparedQuery {
        self.query = query.to_string();
        match self.kind {
            StatementKind::Exec => exec::prepare(query),
            StatementKind::Select => select::prepare(query),
            StatementKind::ShowTables => show_tables::prepare(query),
            StatementKind::ShowColumns => show_columns::prepare(query),
        }
    }

    pub fn set_statement(&mut self, statement: NativeStatement) {
        self.statement = Some(statement);
    }

    /// Bind `args` positionally and run the statement.
    pub fn execute(&self, args: &[Value]) -> Result<QueryResult> {
        let statement = self.statement.as_ref().ok_or_else(|| {
            MySqliteError::Protocol(format!("statement not prepared: {}", self.query))
        })?;
        match self.kind {
            StatementKind::Exec => exec::execute(statement, args),
            StatementKind::Select => select::execute(statement, args),
            StatementKind::ShowTables => show_tables::execute(statement, args),
            StatementKind::ShowColumns => show_columns::execute(statement, args),
        }
    }

    pub fn close(self) -> Result<()> {
        match self.statement {
            Some(statement) => statement.close(),
            None => Ok(()),
        }
    }
}

fn count_placeholders(query: &str) -> usize {
    query.matches('?').count()
}

/// Read argument `index` as text, the way the client sends identifiers.
fn text_argument(args: &[Value], index: usize) -> Result<String> {
    match args.get(index) {
        Some(Value::Text(s)) => Ok(s.clone()),
        Some(Value::Blob(b)) => Ok(String::from_utf8_lossy(b).into_owned()),
        Some(Value::Integer(i)) => Ok(i.to_string()),
        Some(Value::Real(f)) => Ok(f.to_string()),
        Some(Value::Null) => Err(MySqliteError::InvalidParameter(format!("argument {} is NULL", index + 1))),
        None => Err(MySqliteError::InvalidParameter(format!("missing argument {}", index + 1))),
    }
}
