use rusqlite::types::Value;
use tracing::debug;

use crate::Result;
use crate::query::{ExtendedQueryHandler, QueryExecutor, QueryResult};
use crate::session::Session;

/// Prepare-time metadata returned to the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedStatementInfo {
    pub handle_id: u32,
    pub param_count: usize,
    pub column_count: usize,
}

/// Callbacks the MySQL protocol layer invokes for one client connection.
pub trait SessionHandler {
    /// `USE <db>` or the database named in the handshake.
    fn on_select_database(&self, name: &str) -> Result<()>;

    /// Text protocol query (COM_QUERY).
    fn on_query(&self, query: &str) -> Result<QueryResult>;

    fn on_prepare(&self, query: &str) -> Result<PreparedStatementInfo>;

    fn on_execute(&self, handle_id: u32, args: &[Value]) -> Result<QueryResult>;

    fn on_close(&self, handle_id: u32) -> Result<()>;

    /// Client went away; must release every resource the session holds.
    fn on_session_end(&self);
}

impl SessionHandler for Session {
    fn on_select_database(&self, name: &str) -> Result<()> {
        let _enter = self.span().enter();
        debug!("on_select_database: {}", name);
        self.select_database(name)
    }

    fn on_query(&self, query: &str) -> Result<QueryResult> {
        let _enter = self.span().enter();
        debug!("on_query: {}", query);
        QueryExecutor::execute_query(self, query)
    }

    fn on_prepare(&self, query: &str) -> Result<PreparedStatementInfo> {
        let _enter = self.span().enter();
        debug!("on_prepare: {}", query);
        ExtendedQueryHandler::handle_prepare(self, query)
    }

    fn on_execute(&self, handle_id: u32, args: &[Value]) -> Result<QueryResult> {
        let _enter = self.span().enter();
        debug!("on_execute: handle {} with {} args", handle_id, args.len());
        ExtendedQueryHandler::handle_execute(self, handle_id, args)
    }

    fn on_close(&self, handle_id: u32) -> Result<()> {
        let _enter = self.span().enter();
        debug!("on_close: handle {}", handle_id);
        ExtendedQueryHandler::handle_close(self, handle_id)
    }

    fn on_session_end(&self) {
        self.end();
    }
}
