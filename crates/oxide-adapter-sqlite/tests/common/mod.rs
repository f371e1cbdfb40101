#![allow(dead_code)]

use oxide_adapter::prelude::*;
use oxide_adapter_sqlite::SqliteDriver;

pub fn connect() -> Connection {
    let driver = SqliteDriver::memory().expect("Failed to open in-memory SQLite database");
    Connection::new(driver, AdapterConfig::new()).expect("Failed to adapt SQLite session")
}

pub fn connect_with_users() -> Connection {
    let mut conn = connect();
    for sql in [
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username VARCHAR(255) NOT NULL,
            email TEXT,
            balance DECIMAL(10, 2) DEFAULT 0,
            born DATE,
            avatar BLOB
        )",
        "CREATE UNIQUE INDEX idx_users_username ON users (username)",
        "CREATE INDEX idx_users_email_born ON users (email, born)",
    ] {
        conn.execute_update(sql)
            .unwrap_or_else(|e| panic!("Failed to run: {sql}\nError: {e}"));
    }
    conn
}

pub fn count(conn: &mut Connection, table: &str) -> i64 {
    let result = conn
        .execute_query(&format!("SELECT COUNT(*) AS n FROM {table}"))
        .unwrap_or_else(|e| panic!("Failed to count {table}: {e}"));
    result.rows[0][0]
        .as_i64()
        .unwrap_or_else(|| panic!("Expected integer count, got {:?}", result.rows[0][0]))
}
