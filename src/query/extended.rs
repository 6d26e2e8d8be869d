use rusqlite::types::Value;
use tracing::{debug, error};

use crate::query::{QueryExecutor, QueryResult, QueryType, QueryTypeDetector};
use crate::session::{PreparedStatementInfo, Session};
use crate::statement::{NativeStatement, StatementHandler};
use crate::{MySqliteError, Result};

/// Binary protocol commands: COM_STMT_PREPARE, COM_STMT_EXECUTE, COM_STMT_CLOSE.
pub struct ExtendedQueryHandler;

impl ExtendedQueryHandler {
    pub fn handle_prepare(session: &Session, query: &str) -> Result<PreparedStatementInfo> {
        let query_type = QueryTypeDetector::detect_query_type(query);
        let mut handler = StatementHandler::new(query_type);
        let prepared = handler.prepare(query);

        let connection = session.connection()?;
        // Transaction control runs through the session's transaction record,
        // never as a native statement
        if !is_transaction_control(query_type) {
            let native = NativeStatement::bind(&connection, &prepared.sql).map_err(|e| {
                error!("Error while preparing statement {}: {}", prepared.sql, e);
                e
            })?;
            handler.set_statement(native);
        }

        let handle_id = session.statements().insert(handler);
        debug!(
            "Prepared {:?} as handle {} ({} params, {} columns)",
            query_type, handle_id, prepared.param_count, prepared.column_count
        );

        Ok(PreparedStatementInfo {
            handle_id,
            param_count: prepared.param_count,
            column_count: prepared.column_count,
        })
    }

    pub fn handle_execute(session: &Session, handle_id: u32, args: &[Value]) -> Result<QueryResult> {
        let query_type = session
            .statements()
            .get(handle_id)
            .map(|handler| handler.query_type())
            .ok_or(MySqliteError::UnknownStatement(handle_id))?;

        match query_type {
            QueryType::BeginTransaction => QueryExecutor::execute_begin(session),
            QueryType::Commit => QueryExecutor::execute_commit(session),
            _ => {
                let statements = session.statements();
                let handler = statements
                    .get(handle_id)
                    .ok_or(MySqliteError::UnknownStatement(handle_id))?;
                handler.execute(args)
            }
        }
    }

    pub fn handle_close(session: &Session, handle_id: u32) -> Result<()> {
        let handler = session
            .statements()
            .remove(handle_id)
            .ok_or(MySqliteError::UnknownStatement(handle_id))?;
        handler.close()
    }
}

fn is_transaction_control(query_type: QueryType) -> bool {
    matches!(query_type, QueryType::BeginTransaction | QueryType::Commit)
}
