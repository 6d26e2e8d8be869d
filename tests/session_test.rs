use mysqlite::MySqliteError;
use mysqlite::query::Cell;
use mysqlite::session::{ConnectionPool, PoolOptions, Session, SessionHandler};
use pretty_assertions::assert_eq;
use rusqlite::types::Value;
use std::sync::Arc;
use tracing::Span;

const USERS_TABLE: &str =
    "CREATE TABLE `users` (`id` int(11) unsigned auto_increment, `name` varchar(255), PRIMARY KEY (`id`))";

fn memory_pool() -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(PoolOptions::in_memory(), Span::none()))
}

fn session_on(pool: &Arc<ConnectionPool>, database: &str) -> Session {
    let session = Session::new(pool.clone(), &Span::none());
    session.on_select_database(database).unwrap();
    session
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

#[test]
fn test_auto_increment_table_assigns_insert_ids() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");
    session.on_query(USERS_TABLE).unwrap();

    let insert = session.on_prepare("INSERT INTO users (name) VALUES (?)").unwrap();
    assert_eq!((insert.param_count, insert.column_count), (1, 0));

    let first = session.on_execute(insert.handle_id, &[text("alice")]).unwrap();
    assert_eq!((first.insert_id, first.affected_rows), (1, 1));
    let second = session.on_execute(insert.handle_id, &[text("bob")]).unwrap();
    assert_eq!((second.insert_id, second.affected_rows), (2, 1));

    let select = session.on_prepare("SELECT id, name FROM users WHERE name = ?").unwrap();
    let result = session.on_execute(select.handle_id, &[text("bob")]).unwrap();
    assert_eq!(result.columns(), ["id", "name"]);
    assert_eq!(result.rows(), [vec![Cell::Integer(2), Cell::Text("bob".to_string())]]);
}

#[test]
fn test_handle_ids_grow_and_are_never_reused() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");

    let ids: Vec<u32> = (0..3)
        .map(|_| session.on_prepare("SELECT 1").unwrap().handle_id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);

    session.on_close(2).unwrap();
    assert_eq!(session.open_statements(), 2);
    assert_eq!(session.on_prepare("SELECT 1").unwrap().handle_id, 4);

    session.on_close(3).unwrap();
    session.on_close(4).unwrap();
    assert_eq!(session.on_prepare("SELECT 1").unwrap().handle_id, 5);
}

#[test]
fn test_unknown_handles_are_rejected() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");

    let err = session.on_execute(42, &[]).unwrap_err();
    assert!(matches!(err, MySqliteError::UnknownStatement(42)));
    let err = session.on_close(42).unwrap_err();
    assert!(matches!(err, MySqliteError::UnknownStatement(42)));

    let handle = session.on_prepare("SELECT 1").unwrap().handle_id;
    session.on_close(handle).unwrap();
    let err = session.on_close(handle).unwrap_err();
    assert!(matches!(err, MySqliteError::UnknownStatement(id) if id == handle));
    let err = session.on_execute(handle, &[]).unwrap_err();
    assert!(matches!(err, MySqliteError::UnknownStatement(id) if id == handle));
}

#[test]
fn test_prepare_error_allocates_no_handle() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");

    let err = session.on_prepare("SELECT * FROM no_such_table").unwrap_err();
    assert!(matches!(err, MySqliteError::Sqlite(_)));
    assert_eq!(session.open_statements(), 0);
    assert_eq!(session.on_prepare("SELECT 1").unwrap().handle_id, 1);
}

#[test]
fn test_failed_execute_keeps_handle_usable() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");
    session.on_query(USERS_TABLE).unwrap();
    let insert = session.on_prepare("INSERT INTO users (name) VALUES (?)").unwrap();
    session.on_execute(insert.handle_id, &[text("alice")]).unwrap();

    let select = session.on_prepare("SELECT name FROM users WHERE id = ?").unwrap();
    assert!(session.on_execute(select.handle_id, &[]).is_err());

    let result = session.on_execute(select.handle_id, &[Value::Integer(1)]).unwrap();
    assert_eq!(result.rows(), [vec![Cell::Text("alice".to_string())]]);
}

#[test]
fn test_show_columns_checks_stored_definition() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");
    session
        .on_query(r#"CREATE TABLE "t" ("id" INT UNSIGNED AUTO_INCREMENT, "name" TEXT, PRIMARY KEY ("id"))"#)
        .unwrap();

    let show = session.on_prepare(r#"SHOW COLUMNS FROM "t" WHERE Field = ?"#).unwrap();
    assert_eq!((show.param_count, show.column_count), (1, 1));

    let hit = session.on_execute(show.handle_id, &[text("name")]).unwrap();
    assert_eq!(hit.columns(), ["name"]);
    assert_eq!(hit.rows(), [vec![Cell::Text("name".to_string())]]);

    let miss = session.on_execute(show.handle_id, &[text("missing")]).unwrap();
    assert!(miss.result_set.is_none());
    assert!(miss.rows().is_empty());

    let err = session.on_execute(show.handle_id, &[Value::Null]).unwrap_err();
    assert!(matches!(err, MySqliteError::InvalidParameter(_)));
}

#[test]
fn test_show_columns_of_missing_table_is_empty() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");

    let show = session.on_prepare("SHOW COLUMNS FROM `ghost` WHERE Field = ?").unwrap();
    let result = session.on_execute(show.handle_id, &[text("id")]).unwrap();
    assert!(result.rows().is_empty());
}

#[test]
fn test_show_tables_like() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");
    session.on_query(USERS_TABLE).unwrap();

    let show = session.on_prepare("SHOW TABLES LIKE ?").unwrap();
    assert_eq!((show.param_count, show.column_count), (1, 1));

    let hit = session.on_execute(show.handle_id, &[text("users")]).unwrap();
    assert_eq!(hit.rows(), [vec![Cell::Text("users".to_string())]]);

    let miss = session.on_execute(show.handle_id, &[text("orders")]).unwrap();
    assert!(miss.rows().is_empty());

    let err = session.on_execute(show.handle_id, &[]).unwrap_err();
    assert!(matches!(err, MySqliteError::InvalidParameter(_)));
}

#[test]
fn test_text_select_normalizes_null() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");

    let result = session.on_query("SELECT NULL AS nothing, 7 AS seven, 'x' AS letter").unwrap();
    assert_eq!(result.columns(), ["nothing", "seven", "letter"]);
    assert_eq!(
        result.rows(),
        [vec![Cell::Bytes(Vec::new()), Cell::Integer(7), Cell::Text("x".to_string())]]
    );
    assert_eq!(result.result_set.map(|rs| rs.binary), Some(false));
}

#[test]
fn test_select_database() {
    let pool = memory_pool();
    let session = Session::new(pool.clone(), &Span::none());

    let none = session.on_query("select database()").unwrap();
    assert_eq!(none.columns(), ["DATABASE()"]);
    assert_eq!(none.rows(), [vec![Cell::Bytes(Vec::new())]]);

    session.on_select_database("app").unwrap();
    let some = session.on_query("SELECT DATABASE()").unwrap();
    assert_eq!(some.rows(), [vec![Cell::Text("app".to_string())]]);
}

#[test]
fn test_commands_need_a_database() {
    let pool = memory_pool();
    let session = Session::new(pool.clone(), &Span::none());

    assert!(matches!(session.on_query("SELECT 1").unwrap_err(), MySqliteError::NoDatabaseSelected));
    assert!(matches!(session.on_prepare("SELECT 1").unwrap_err(), MySqliteError::NoDatabaseSelected));
    assert!(matches!(
        session.on_query("START TRANSACTION").unwrap_err(),
        MySqliteError::NoDatabaseSelected
    ));
    assert!(!session.in_transaction());
    assert_eq!(pool.active_databases(), 0);
}

#[test]
fn test_session_stays_on_one_database() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");

    session.on_select_database("app").unwrap();
    assert_eq!(pool.lease_count("app"), 1);

    let err = session.on_select_database("other").unwrap_err();
    assert!(matches!(err, MySqliteError::DatabaseAlreadySelected { .. }));
    assert_eq!(session.database().as_deref(), Some("app"));
    assert_eq!(pool.active_databases(), 1);

    let fresh = Session::new(pool.clone(), &Span::none());
    let err = fresh.on_select_database("../escape").unwrap_err();
    assert!(matches!(err, MySqliteError::InvalidDatabaseName(_)));
    assert_eq!(fresh.database(), None);
}

#[test]
fn test_unsupported_text_commands() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");
    session.on_query(USERS_TABLE).unwrap();

    for query in ["INSERT INTO users (name) VALUES ('x')", "DROP TABLE users", "SHOW TABLES"] {
        let err = session.on_query(query).unwrap_err();
        assert!(matches!(err, MySqliteError::NotSupported(_)), "{query}: {err}");
    }
}

#[test]
fn test_alter_table_through_text_protocol() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");
    session.on_query(USERS_TABLE).unwrap();

    let result = session.on_query("ALTER TABLE users ADD COLUMN age INTEGER").unwrap();
    assert!(result.result_set.is_none());

    let select = session.on_prepare("SELECT age FROM users").unwrap();
    assert!(session.on_execute(select.handle_id, &[]).unwrap().rows().is_empty());
}

#[test]
fn test_session_end_releases_everything() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");
    session.on_prepare("SELECT 1").unwrap();
    session.on_prepare("SELECT 2").unwrap();
    assert_eq!(pool.lease_count("app"), 1);

    session.on_session_end();
    assert_eq!(session.open_statements(), 0);
    assert_eq!(session.database(), None);
    assert_eq!(pool.active_databases(), 0);
    assert!(matches!(session.on_execute(1, &[]).unwrap_err(), MySqliteError::UnknownStatement(1)));
    assert!(matches!(session.on_query("SELECT 1").unwrap_err(), MySqliteError::NoDatabaseSelected));

    // A second teardown, and the one run on drop, are no-ops
    session.on_session_end();
    drop(session);
    assert_eq!(pool.active_databases(), 0);
}

#[test]
fn test_dropping_session_releases_lease() {
    let pool = memory_pool();
    let keeper = session_on(&pool, "app");
    {
        let _visitor = session_on(&pool, "app");
        assert_eq!(pool.lease_count("app"), 2);
    }
    assert_eq!(pool.lease_count("app"), 1);
    drop(keeper);
    assert_eq!(pool.active_databases(), 0);
}

#[test]
fn test_prepared_row_returning_statements_run_as_exec() {
    let pool = memory_pool();
    let session = session_on(&pool, "app");
    session.on_query(USERS_TABLE).unwrap();
    let insert = session.on_prepare("INSERT INTO users (name) VALUES (?)").unwrap();
    session.on_execute(insert.handle_id, &[text("alice")]).unwrap();

    for query in ["PRAGMA user_version", "WITH x AS (SELECT 1) SELECT * FROM x", "VALUES (1)"] {
        let prepared = session.on_prepare(query).unwrap();
        assert_eq!(prepared.column_count, 0, "{query}");

        let result = session.on_execute(prepared.handle_id, &[]).unwrap();
        assert!(result.result_set.is_none(), "{query}");
        assert_eq!(result.insert_id, 1, "{query}");
    }
}
