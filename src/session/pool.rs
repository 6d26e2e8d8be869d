use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Span};

use crate::{MySqliteError, Result};

/// A backing SQLite connection shared by every session using the same database name.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Where database files are opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// `<dir>/<database name>`
    Directory(PathBuf),
    /// One private in-memory database per name, alive while it is leased.
    InMemory,
}

#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub location: DatabaseLocation,
    pub journal_mode: String,
    pub synchronous: String,
    pub cache_size: i32,
    pub statement_cache_size: usize,
}

impl PoolOptions {
    pub fn in_memory() -> Self {
        Self::with_location(DatabaseLocation::InMemory)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::with_location(DatabaseLocation::Directory(path.into()))
    }

    fn with_location(location: DatabaseLocation) -> Self {
        PoolOptions {
            location,
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
            cache_size: -64000,
            statement_cache_size: 100,
        }
    }
}

struct PoolEntry {
    connection: SharedConnection,
    leases: i64,
}

/// Reference counted connections keyed by database name.
///
/// All mutations go through one lock around the whole map. Opening and
/// closing a connection happens while that lock is held, so a slow open
/// stalls every other acquire and release until it finishes.
pub struct ConnectionPool {
    options: PoolOptions,
    entries: Mutex<HashMap<String, PoolEntry>>,
    span: Span,
}

impl ConnectionPool {
    pub fn new(options: PoolOptions, span: Span) -> Self {
        Self {
            options,
            entries: Mutex::new(HashMap::new()),
            span,
        }
    }

    /// Lease the connection for `name`, opening it on first use.
    pub fn acquire(&self, name: &str) -> Result<SharedConnection> {
        let _enter = self.span.enter();
        validate_database_name(name)?;

        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(name) {
            entry.leases += 1;
            debug!("Reusing connection for database {} (leases: {})", name, entry.leases);
            return Ok(entry.connection.clone());
        }

        let conn = self.open(name).map_err(|e| {
            error!("Cannot open database {}: {}", name, e);
            e
        })?;
        let connection = Arc::new(Mutex::new(conn));
        entries.insert(
            name.to_string(),
            PoolEntry {
                connection: connection.clone(),
                leases: 1,
            },
        );
        info!("Opened database {} (open databases: {})", name, entries.len());

        Ok(connection)
    }

    /// Give back one lease on `name`; the last one closes the connection.
    ///
    /// Releasing a name that is not in the pool is logged and otherwise ignored.
    pub fn release(&self, name: &str) {
        let _enter = self.span.enter();
        let mut entries = self.entries.lock();

        let Some(entry) = entries.get_mut(name) else {
            error!("Release of database {} which is not in the pool", name);
            return;
        };

        entry.leases -= 1;
        debug!("Released database {} (leases: {})", name, entry.leases);
        if entry.leases > 0 {
            return;
        }

        if let Some(entry) = entries.remove(name) {
            match Arc::try_unwrap(entry.connection) {
                Ok(mutex) => {
                    if let Err((_, e)) = mutex.into_inner().close() {
                        error!("Failed to close database {}: {}", name, e);
                    }
                }
                Err(_) => {
                    warn!("Database {} still referenced after last release; it closes when dropped", name);
                }
            }
            info!("Closed database {} (open databases: {})", name, entries.len());
        }
    }

    /// Number of databases with an open backing connection.
    pub fn active_databases(&self) -> usize {
        self.entries.lock().len()
    }

    /// Outstanding leases for `name`, zero when it is not open.
    pub fn lease_count(&self, name: &str) -> i64 {
        self.entries.lock().get(name).map(|e| e.leases).unwrap_or(0)
    }

    fn open(&self, name: &str) -> Result<Connection> {
        let conn = match &self.options.location {
            DatabaseLocation::InMemory => Connection::open_in_memory()?,
            DatabaseLocation::Directory(dir) => {
                let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
                let path = dir.join(name);
                debug!("Opening database file {}", path.display());
                Connection::open_with_flags(&path, flags)?
            }
        };

        let pragma_sql = format!(
            "PRAGMA journal_mode = {};
             PRAGMA synchronous = {};
             PRAGMA cache_size = {};
             PRAGMA temp_store = MEMORY;",
            self.options.journal_mode, self.options.synchronous, self.options.cache_size
        );
        conn.execute_batch(&pragma_sql)?;
        conn.set_prepared_statement_cache_capacity(self.options.statement_cache_size);

        Ok(conn)
    }
}

/// Database names become file names, so they must stay inside the data directory.
pub fn validate_database_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(MySqliteError::InvalidDatabaseName(name.to_string()));
    }
    Ok(())
}

/// A session's hold on one pooled database, released exactly once.
pub struct PoolLease {
    pool: Arc<ConnectionPool>,
    database: String,
    connection: Option<SharedConnection>,
}

impl PoolLease {
    pub fn acquire(pool: &Arc<ConnectionPool>, database: &str) -> Result<Self> {
        let connection = pool.acquire(database)?;
        Ok(Self {
            pool: pool.clone(),
            database: database.to_string(),
            connection: Some(connection),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn connection(&self) -> Option<&SharedConnection> {
        self.connection.as_ref()
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        // Drop our reference first so the pool can close the connection
        if self.connection.take().is_some() {
            self.pool.release(&self.database);
        }
    }
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_database_name() {
        assert!(validate_database_name("app").is_ok());
        assert!(validate_database_name("app.db").is_ok());
        assert!(validate_database_name("").is_err());
        assert!(validate_database_name("..").is_err());
        assert!(validate_database_name("../etc").is_err());
        assert!(validate_database_name("a\\b").is_err());
        assert!(validate_database_name("a\0b").is_err());
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let pool = Arc::new(ConnectionPool::new(PoolOptions::in_memory(), Span::none()));
        {
            let lease = PoolLease::acquire(&pool, "x").unwrap();
            assert_eq!(lease.database(), "x");
            assert!(lease.connection().is_some());
            assert_eq!(pool.lease_count("x"), 1);
        }
        assert_eq!(pool.lease_count("x"), 0);
        assert_eq!(pool.active_databases(), 0);
    }
}
