use tracing::{debug, error, warn};

use crate::query::{Cell, QueryResult, QueryType, QueryTypeDetector, ResultBuilder};
use crate::session::{OpenTransaction, Session};
use crate::translator::CreateTableTranslator;
use crate::{MySqliteError, Result};

/// Text protocol (COM_QUERY) commands.
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn execute_query(session: &Session, query: &str) -> Result<QueryResult> {
        match QueryTypeDetector::detect_query_type(query) {
            QueryType::Select => Self::execute_select(session, query),
            QueryType::BeginTransaction => Self::execute_begin(session),
            QueryType::Commit => Self::execute_commit(session),
            QueryType::CreateTable => Self::execute_create_table(session, query),
            QueryType::AlterTable => Self::execute_statement(session, query),
            QueryType::SelectCurrentDatabase => Ok(Self::select_current_database(session)),
            other => {
                debug!("Unsupported text command ({:?}): {}", other, query);
                Err(MySqliteError::NotSupported(format!("command not supported: {}", query.trim())))
            }
        }
    }

    fn execute_select(session: &Session, query: &str) -> Result<QueryResult> {
        let connection = session.connection()?;
        let conn = connection.lock();
        let mut stmt = conn.prepare(query)?;
        ResultBuilder::query(&mut stmt, [], false)
    }

    pub(crate) fn execute_begin(session: &Session) -> Result<QueryResult> {
        let mut transaction = session.transaction();
        if transaction.is_some() {
            return Err(MySqliteError::Transaction("transaction already in progress".to_string()));
        }

        let connection = session.connection()?;
        let begun = OpenTransaction::begin(&connection).map_err(|e| {
            error!("Error while beginning transaction: {}", e);
            e
        })?;
        *transaction = Some(begun);
        Ok(QueryResult::empty())
    }

    pub(crate) fn execute_commit(session: &Session) -> Result<QueryResult> {
        let mut transaction = session.transaction();
        let Some(open) = transaction.as_ref() else {
            return Err(MySqliteError::Transaction("no transaction in progress".to_string()));
        };

        // On failure the transaction stays recorded as open
        open.commit()?;
        *transaction = None;
        Ok(QueryResult::empty())
    }

    fn execute_create_table(session: &Session, query: &str) -> Result<QueryResult> {
        let translated = CreateTableTranslator::translate(query);
        for warning in &translated.warnings {
            warn!("CREATE TABLE rewrite incomplete: {}", warning);
        }
        debug!("Translated CREATE TABLE: {}", translated.sql);
        Self::execute_statement(session, &translated.sql)
    }

    fn execute_statement(session: &Session, sql: &str) -> Result<QueryResult> {
        let connection = session.connection()?;
        let conn = connection.lock();
        let affected = conn.execute(sql, []).map_err(|e| {
            error!("Error while executing statement {}: {}", sql, e);
            e
        })?;
        Ok(QueryResult::exec(conn.last_insert_rowid(), affected))
    }

    fn select_current_database(session: &Session) -> QueryResult {
        let cell = match session.database() {
            Some(name) => Cell::Text(name),
            None => Cell::Bytes(Vec::new()),
        };
        QueryResult::simple(&["DATABASE()"], vec![vec![cell]], false)
    }
}
