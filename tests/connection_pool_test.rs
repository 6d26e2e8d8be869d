use mysqlite::MySqliteError;
use mysqlite::session::{ConnectionPool, PoolOptions};
use std::sync::Arc;
use std::thread;
use tracing::Span;

fn memory_pool() -> ConnectionPool {
    ConnectionPool::new(PoolOptions::in_memory(), Span::none())
}

#[test]
fn test_one_connection_per_database_name() {
    let pool = memory_pool();

    let first = pool.acquire("app").unwrap();
    let second = pool.acquire("app").unwrap();
    let other = pool.acquire("other").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(pool.lease_count("app"), 2);
    assert_eq!(pool.lease_count("other"), 1);
    assert_eq!(pool.active_databases(), 2);
}

#[test]
fn test_last_release_closes_connection() {
    let pool = memory_pool();

    let first = pool.acquire("app").unwrap();
    let second = pool.acquire("app").unwrap();
    drop(second);
    pool.release("app");

    // One lease left, the connection must still be open and usable
    assert_eq!(pool.active_databases(), 1);
    assert_eq!(pool.lease_count("app"), 1);
    first.lock().execute_batch("CREATE TABLE t (id INTEGER)").unwrap();

    drop(first);
    pool.release("app");
    assert_eq!(pool.active_databases(), 0);
    assert_eq!(pool.lease_count("app"), 0);
}

#[test]
fn test_in_memory_database_is_fresh_after_close() {
    let pool = memory_pool();

    let conn = pool.acquire("scratch").unwrap();
    conn.lock().execute_batch("CREATE TABLE t (id INTEGER)").unwrap();
    drop(conn);
    pool.release("scratch");

    let conn = pool.acquire("scratch").unwrap();
    let tables: i64 = conn
        .lock()
        .query_row("SELECT count(*) FROM sqlite_master WHERE type = 'table'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(tables, 0);
}

#[test]
fn test_release_of_unknown_database_is_ignored() {
    let pool = memory_pool();
    pool.release("missing");
    assert_eq!(pool.active_databases(), 0);

    let _conn = pool.acquire("app").unwrap();
    pool.release("missing");
    assert_eq!(pool.lease_count("app"), 1);
}

#[test]
fn test_invalid_database_names_are_rejected() {
    let pool = memory_pool();
    for name in ["", "..", "../etc/passwd", "a/b"] {
        let err = pool.acquire(name).unwrap_err();
        assert!(matches!(err, MySqliteError::InvalidDatabaseName(_)), "{name:?}: {err}");
    }
    assert_eq!(pool.active_databases(), 0);
}

#[test]
fn test_database_files_live_in_data_directory() {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::new(PoolOptions::directory(dir.path()), Span::none());

    let conn = pool.acquire("app.db").unwrap();
    conn.lock().execute_batch("CREATE TABLE t (id INTEGER)").unwrap();
    assert!(dir.path().join("app.db").exists());
    drop(conn);
    pool.release("app.db");
    assert_eq!(pool.active_databases(), 0);

    // Reopening sees the data written through the first connection
    let conn = pool.acquire("app.db").unwrap();
    let tables: i64 = conn
        .lock()
        .query_row("SELECT count(*) FROM sqlite_master WHERE name = 't'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn test_concurrent_acquire_and_release() {
    let pool = Arc::new(memory_pool());

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let conn = pool.acquire("busy").unwrap();
                    let one: i64 = conn.lock().query_row("SELECT 1", [], |row| row.get(0)).unwrap();
                    assert_eq!(one, 1);
                    drop(conn);
                    pool.release("busy");
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(pool.lease_count("busy"), 0);
    assert_eq!(pool.active_databases(), 0);
}
