//! Tests for table, column and index listings.

mod common;
use common::*;

use oxide_adapter::memory::{FailPoint, MemoryDriver};
use oxide_adapter::prelude::*;

fn mssql_catalog() -> MemoryDriver {
    MemoryDriver::new(MSSQL)
        .with_table(table(Some("dbo"), Some("users")))
        .with_table(table(Some("sys"), Some("objects")))
        .with_table(table(Some("INFORMATION_SCHEMA"), Some("tables")))
}

#[test]
fn system_schemas_hidden_without_schema_filter() {
    let mut conn = connect(mssql_catalog());
    let names = conn.tables(TableQuery::default()).unwrap();
    assert_eq!(names, vec!["users"]);
}

#[test]
fn system_schema_listed_when_asked_for() {
    let mut conn = connect(mssql_catalog());
    let names = conn
        .tables(TableQuery {
            schema: Some("sys"),
            ..TableQuery::default()
        })
        .unwrap();
    assert_eq!(names, vec!["objects"]);
}

#[test]
fn null_table_name_is_ambiguous_metadata() {
    let driver = MemoryDriver::new(MSSQL)
        .with_table(table(Some("dbo"), Some("users")))
        .with_table(table(Some("dbo"), None));
    let mut conn = connect(driver);
    let err = conn
        .tables(TableQuery {
            catalog: Some("app"),
            schema: Some("dbo"),
            name: Some("%"),
            ..TableQuery::default()
        })
        .unwrap_err();
    match &err {
        AdapterError::AmbiguousMetadata {
            catalog,
            schema,
            table,
            hint,
        } => {
            assert_eq!(catalog.as_deref(), Some("app"));
            assert_eq!(schema.as_deref(), Some("dbo"));
            assert_eq!(table.as_deref(), Some("%"));
            assert!(hint.contains("SHOWPLAN_TEXT"));
        }
        other => panic!("Expected ambiguous metadata, got {other:?}"),
    }
    assert!(err
        .to_string()
        .starts_with("got null name while matching table(s): [app.dbo.%]"));
}

#[test]
fn db2_names_converted_to_caller_case() {
    let driver = MemoryDriver::new(DB2)
        .with_table(table(Some("APP"), Some("USERS")))
        .with_table(table(Some("APP"), Some("MixedCase")));
    let mut conn = connect(driver);
    let names = conn
        .tables(TableQuery {
            schema: Some("app"),
            ..TableQuery::default()
        })
        .unwrap();
    assert_eq!(names, vec!["users", "MixedCase"]);
}

#[test]
fn sqlite_table_names_lowercased() {
    let driver = MemoryDriver::new(SQLITE).with_table(table(None, Some("Users")));
    let mut conn = connect(driver);
    assert_eq!(conn.tables(TableQuery::default()).unwrap(), vec!["users"]);
}

#[test]
fn table_scan_failure_propagates() {
    let driver =
        MemoryDriver::new(SQLITE).with_failure(FailPoint::Tables, DriverFailure::new("boom"));
    let mut conn = connect(driver);
    assert!(conn.tables(TableQuery::default()).unwrap_err().is_driver());
}

#[test]
fn columns_marked_primary_key_on_request() {
    let driver = MemoryDriver::new(SQLITE)
        .with_columns(
            "users",
            vec![
                column("id", SqlType::Integer, "INTEGER"),
                column("name", SqlType::Varchar, "VARCHAR(255)"),
            ],
        )
        .with_primary_key("users", &["id"]);
    let mut conn = connect(driver);

    let columns = conn.columns("users", None, false).unwrap();
    assert!(columns.iter().all(|c| !c.primary_key));

    let columns = conn.columns("users", None, true).unwrap();
    assert!(columns[0].primary_key);
    assert!(!columns[1].primary_key);
    assert_eq!(columns[1].type_name, "VARCHAR(255)");
}

#[test]
fn mssql_always_marks_primary_keys_and_hides_row_num() {
    let driver = MemoryDriver::new(MSSQL)
        .with_columns(
            "users",
            vec![
                column("id", SqlType::Integer, "int"),
                column("_row_num", SqlType::BigInt, "bigint"),
            ],
        )
        .with_primary_key("users", &["id"]);
    let mut conn = connect(driver);
    let columns = conn.columns("dbo.users", None, false).unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].name, "id");
    assert!(columns[0].primary_key);
}

#[test]
fn malformed_table_name_rejected() {
    let mut conn = connect(MemoryDriver::new(SQLITE));
    let err = conn.columns("a.b.c.d", None, false).unwrap_err();
    assert_state_error(&err, "table name: a.b.c.d should not contain more than 2 '.'");
}

#[test]
fn consecutive_index_rows_merged() {
    let driver = MemoryDriver::new(SQLITE)
        .with_primary_key("users", &["id"])
        .with_index_rows(
            "users",
            vec![
                index_row("users", Some("idx_a"), "x", true),
                index_row("users", Some("idx_a"), "id", true),
                index_row("users", Some("idx_a"), "y", true),
                index_row("users", Some("idx_b"), "z", false),
            ],
        );
    let mut conn = connect(driver);
    let indexes = conn.indexes("users", None, None).unwrap();
    assert_eq!(
        indexes,
        vec![
            IndexDescriptor {
                table_name: "users".into(),
                index_name: "idx_a".into(),
                unique: false,
                columns: vec!["x".into(), "y".into()],
            },
            IndexDescriptor {
                table_name: "users".into(),
                index_name: "idx_b".into(),
                unique: true,
                columns: vec!["z".into()],
            },
        ]
    );
}

#[test]
fn primary_key_index_suppressed() {
    let driver = MemoryDriver::new(SQLITE)
        .with_primary_key("users", &["id"])
        .with_index_rows(
            "users",
            vec![
                index_row("users", Some("sqlite_autoindex_users_1"), "id", false),
                index_row("users", None, "email", true),
            ],
        );
    let mut conn = connect(driver);
    assert!(conn.indexes("users", None, None).unwrap().is_empty());
}

#[test]
fn index_name_filter() {
    let driver = MemoryDriver::new(SQLITE).with_index_rows(
        "users",
        vec![
            index_row("users", Some("idx_a"), "x", true),
            index_row("users", Some("idx_b"), "z", true),
        ],
    );
    let mut conn = connect(driver);
    let indexes = conn.indexes("users", None, Some("idx_b")).unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].index_name, "idx_b");
}

#[test]
fn sqlite_schema_prefix_folded_into_lookup() {
    let driver = MemoryDriver::new(SQLITE).with_index_rows(
        "main.users",
        vec![index_row("users", Some("idx_a"), "x", true)],
    );
    let mut conn = connect(driver);
    assert_eq!(conn.indexes("main.users", None, None).unwrap().len(), 1);
    assert_eq!(conn.indexes("users", Some("main"), None).unwrap().len(), 1);
    assert!(conn.indexes("users", None, None).unwrap().is_empty());
}

#[test]
fn sqlite_no_index_failure_is_empty() {
    let driver = MemoryDriver::new(SQLITE).with_failure(
        FailPoint::IndexInfo,
        DriverFailure::new("[SQLITE_ERROR] SQL error or missing database (no such table)"),
    );
    let mut conn = connect(driver);
    assert!(conn.indexes("empty", None, None).unwrap().is_empty());
}

#[test]
fn other_index_failures_propagate() {
    let driver = MemoryDriver::new(MSSQL).with_failure(
        FailPoint::IndexInfo,
        DriverFailure::new("[SQLITE_ERROR] SQL error or missing database"),
    );
    let mut conn = connect(driver);
    assert!(conn.indexes("users", None, None).unwrap_err().is_driver());
}
