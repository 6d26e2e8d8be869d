use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Span, info, info_span, warn};
use uuid::Uuid;

use crate::session::pool::{ConnectionPool, PoolLease, SharedConnection};
use crate::statement::StatementHandler;
use crate::{MySqliteError, Result};

/// Live prepared statements of one session, keyed by handle id.
///
/// Ids start at 1, only ever grow, and are never handed out twice.
#[derive(Default)]
pub struct StatementTable {
    next_id: u32,
    handlers: HashMap<u32, StatementHandler>,
}

impl StatementTable {
    pub fn insert(&mut self, handler: StatementHandler) -> u32 {
        self.next_id += 1;
        self.handlers.insert(self.next_id, handler);
        self.next_id
    }

    pub fn get(&self, id: u32) -> Option<&StatementHandler> {
        self.handlers.get(&id)
    }

    pub fn remove(&mut self, id: u32) -> Option<StatementHandler> {
        self.handlers.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Take every handler out, lowest id first.
    pub fn drain(&mut self) -> Vec<(u32, StatementHandler)> {
        let mut handlers: Vec<_> = self.handlers.drain().collect();
        handlers.sort_by_key(|(id, _)| *id);
        handlers
    }
}

/// A transaction begun by this session on its (shared) connection.
pub struct OpenTransaction {
    connection: SharedConnection,
}

impl OpenTransaction {
    pub fn begin(connection: &SharedConnection) -> Result<Self> {
        connection.lock().execute_batch("BEGIN")?;
        Ok(Self {
            connection: connection.clone(),
        })
    }

    pub fn commit(&self) -> Result<()> {
        self.connection.lock().execute_batch("COMMIT")?;
        Ok(())
    }

    /// Roll back unless the connection already left the transaction, in
    /// which case a ROLLBACK would hit whatever another session has open.
    pub fn rollback(self) -> Result<()> {
        let conn = self.connection.lock();
        if conn.is_autocommit() {
            warn!("Transaction already ended on the connection, skipping rollback");
            return Ok(());
        }
        conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Per client connection state.
///
/// Commands from one client arrive one at a time, but teardown can come
/// from another task, so every field sits behind its own lock.
pub struct Session {
    pub id: Uuid,
    pool: Arc<ConnectionPool>,
    lease: Mutex<Option<PoolLease>>,
    transaction: Mutex<Option<OpenTransaction>>,
    statements: Mutex<StatementTable>,
    span: Span,
}

impl Session {
    pub fn new(pool: Arc<ConnectionPool>, parent: &Span) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            pool,
            lease: Mutex::new(None),
            transaction: Mutex::new(None),
            statements: Mutex::new(StatementTable::default()),
            span: info_span!(parent: parent, "session", id = %id),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Bind the session to `database`. A session never spans two databases.
    pub fn select_database(&self, database: &str) -> Result<()> {
        let mut lease = self.lease.lock();
        if let Some(current) = lease.as_ref() {
            if current.database() == database {
                return Ok(());
            }
            return Err(MySqliteError::DatabaseAlreadySelected {
                current: current.database().to_string(),
                requested: database.to_string(),
            });
        }

        *lease = Some(PoolLease::acquire(&self.pool, database)?);
        info!("Using database {}", database);
        Ok(())
    }

    pub fn database(&self) -> Option<String> {
        self.lease.lock().as_ref().map(|l| l.database().to_string())
    }

    pub fn connection(&self) -> Result<SharedConnection> {
        self.lease
            .lock()
            .as_ref()
            .and_then(|l| l.connection().cloned())
            .ok_or(MySqliteError::NoDatabaseSelected)
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.lock().is_some()
    }

    pub(crate) fn transaction(&self) -> MutexGuard<'_, Option<OpenTransaction>> {
        self.transaction.lock()
    }

    pub(crate) fn statements(&self) -> MutexGuard<'_, StatementTable> {
        self.statements.lock()
    }

    pub fn open_statements(&self) -> usize {
        self.statements.lock().len()
    }

    /// Close every statement, roll back our own transaction, release the lease.
    /// Each step runs even when an earlier one fails. Safe to call twice.
    pub fn end(&self) {
        let _enter = self.span.enter();

        let handlers = self.statements.lock().drain();
        for (id, handler) in handlers {
            if let Err(e) = handler.close() {
                warn!("Failed to close statement {}: {}", id, e);
            }
        }

        let transaction = self.transaction.lock().take();
        if let Some(transaction) = transaction {
            warn!("Session ended inside a transaction, rolling back");
            if let Err(e) = transaction.rollback() {
                warn!("Rollback on session end failed: {}", e);
            }
        }

        let lease = self.lease.lock().take();
        if let Some(lease) = lease {
            info!("Releasing database {}", lease.database());
            lease.release();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.end();
    }
}
