//! Tests for the adapter over a real SQLite database.

mod common;
use common::*;

use oxide_adapter::prelude::*;
use oxide_adapter_sqlite::{SqliteDriver, DRIVER_NAME};

#[test]
fn sqlite_dialect_detected() {
    let conn = connect();
    assert_eq!(conn.driver_name(), DRIVER_NAME);
    assert_eq!(conn.dialect().name(), "sqlite");
}

#[test]
fn insert_returns_generated_keys() {
    let mut conn = connect_with_users();
    let keys = conn
        .execute_insert(
            "INSERT INTO users (username) VALUES ('alice')",
            KeyShape::Single,
        )
        .unwrap();
    assert_eq!(keys, GeneratedKeys::Single(Value::Integer(1)));
    conn.execute_update("INSERT INTO users (username) VALUES ('bob')")
        .unwrap();
    assert_eq!(conn.last_insert_id().unwrap(), Value::Integer(2));
}

#[test]
fn values_coerced_by_declared_type() {
    let mut conn = connect_with_users();
    conn.execute_update(
        "INSERT INTO users (username, email, balance, born, avatar) \
         VALUES ('alice', NULL, 12.5, '1990-02-03', x'0102')",
    )
    .unwrap();
    let result = conn
        .execute_query("SELECT id, username, email, born, avatar FROM users")
        .unwrap();
    assert_eq!(result.columns.len(), 5);
    assert_eq!(
        result.rows,
        vec![vec![
            Value::Integer(1),
            Value::Text("alice".into()),
            Value::Absent,
            Value::Text("1990-02-03".into()),
            Value::Binary(vec![1, 2]),
        ]]
    );
}

#[test]
fn empty_result_keeps_columns() {
    let mut conn = connect_with_users();
    let result = conn.execute_query("SELECT id, username FROM users").unwrap();
    assert!(result.rows.is_empty());
    assert_eq!(result.column_index("username"), Some(1));
}

#[test]
fn driver_errors_surface() {
    let mut conn = connect();
    let err = conn.execute_query("SELECT * FROM missing").unwrap_err();
    assert!(err.is_driver());
    assert!(err.to_string().contains("no such table"));
}

#[test]
fn emulated_savepoints() {
    let mut conn = connect_with_users();
    conn.create_savepoint("before_alice").unwrap();
    conn.execute_update("INSERT INTO users (username) VALUES ('alice')")
        .unwrap();
    conn.create_savepoint("before_bob").unwrap();
    conn.execute_update("INSERT INTO users (username) VALUES ('bob')")
        .unwrap();
    assert_eq!(count(&mut conn, "users"), 2);

    conn.rollback_savepoint("before_bob").unwrap();
    assert_eq!(count(&mut conn, "users"), 1);

    conn.rollback_savepoint("before_alice").unwrap();
    assert_eq!(count(&mut conn, "users"), 0);
    assert!(!conn.savepoints().contains("before_bob"));

    conn.release_savepoint("before_alice").unwrap();
    let err = conn.release_savepoint("before_alice").unwrap_err();
    assert_eq!(
        err.to_string(),
        "could not release savepoint: 'before_alice' (not set)"
    );
}

#[test]
fn tables_listed() {
    let mut conn = connect_with_users();
    conn.execute_update("CREATE VIEW active_users AS SELECT * FROM users")
        .unwrap();
    let names = conn.tables(TableQuery::default()).unwrap();
    assert_eq!(names, vec!["active_users", "users"]);

    let names = conn
        .tables(TableQuery {
            types: &["TABLE"],
            ..TableQuery::default()
        })
        .unwrap();
    assert_eq!(names, vec!["users"]);

    let names = conn
        .tables(TableQuery {
            name: Some("act%"),
            ..TableQuery::default()
        })
        .unwrap();
    assert_eq!(names, vec!["active_users"]);
}

#[test]
fn columns_listed() {
    let mut conn = connect_with_users();
    let columns = conn.columns("users", None, true).unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "username", "email", "balance", "born", "avatar"]
    );
    assert!(columns[0].primary_key);
    assert!(!columns[1].nullable);
    assert_eq!(columns[1].sql_type, SqlType::Varchar);
    assert_eq!(columns[1].precision, Some(255));
    assert_eq!(columns[3].sql_type, SqlType::Decimal);
    assert_eq!(columns[3].scale, Some(2));
    assert_eq!(columns[3].default.as_deref(), Some("0"));

    let qualified = conn.columns("main.users", None, false).unwrap();
    assert_eq!(qualified.len(), 6);
}

#[test]
fn indexes_listed() {
    let mut conn = connect_with_users();
    let indexes = conn.indexes("users", None, None).unwrap();
    assert_eq!(
        indexes,
        vec![
            IndexDescriptor {
                table_name: "users".into(),
                index_name: "idx_users_email_born".into(),
                unique: false,
                columns: vec!["email".into(), "born".into()],
            },
            IndexDescriptor {
                table_name: "users".into(),
                index_name: "idx_users_username".into(),
                unique: true,
                columns: vec!["username".into()],
            },
        ]
    );
    let only = conn
        .indexes("users", Some("main"), Some("idx_users_username"))
        .unwrap();
    assert_eq!(only.len(), 1);
}

#[test]
fn unknown_schema_index_scan_is_empty() {
    let mut conn = connect_with_users();
    assert!(conn.indexes("users", Some("aux"), None).unwrap().is_empty());
}

#[test]
fn on_disk_database() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("app.db").display());
    {
        let driver = SqliteDriver::connect(&url).unwrap();
        let mut conn = Connection::new(driver, AdapterConfig::new()).unwrap();
        conn.execute_update("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
            .unwrap();
        conn.execute_update("INSERT INTO notes (body) VALUES ('persisted')")
            .unwrap();
    }
    let driver = SqliteDriver::connect(&url).unwrap();
    let mut conn = Connection::new(driver, AdapterConfig::new()).unwrap();
    let result = conn.execute_query("SELECT body FROM notes").unwrap();
    assert_eq!(result.rows, vec![vec![Value::Text("persisted".into())]]);
}
