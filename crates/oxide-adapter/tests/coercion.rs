//! Tests for value coercion and generated keys through a connection.

mod common;
use common::*;

use chrono::NaiveDate;
use oxide_adapter::coerce::{path_for, CoercionPath};
use oxide_adapter::memory::{MemoryDriver, MemoryResult};
use oxide_adapter::prelude::*;

#[test]
fn null_is_absent_not_empty() {
    let conn = connect(MemoryDriver::new("memdb"));
    assert_eq!(
        conn.coerce_value(SqlType::Varchar, RawCell::Null).unwrap(),
        Value::Absent
    );
    assert_eq!(
        conn.coerce_value(SqlType::Varchar, RawCell::Text(String::new()))
            .unwrap(),
        Value::Text(String::new())
    );
    assert_eq!(
        conn.coerce_value(SqlType::Blob, RawCell::Bytes(Vec::new())).unwrap(),
        Value::Binary(Vec::new())
    );
}

#[test]
fn large_text_bytes_decoded_strictly() {
    let conn = connect(MemoryDriver::new("memdb"));
    assert_eq!(
        conn.coerce_value(SqlType::Clob, RawCell::Bytes("naïve".as_bytes().to_vec()))
            .unwrap(),
        Value::Text("naïve".into())
    );
    let err = conn
        .coerce_value(SqlType::Clob, RawCell::Bytes(vec![0x66, 0xff, 0x6f]))
        .unwrap_err();
    assert!(err.is_driver());
}

#[test]
fn long_varchar_takes_large_text_path_on_mssql() {
    let conn = connect(MemoryDriver::new(MSSQL));
    let reclassified = conn.dialect().reclassify(SqlType::LongVarchar);
    assert_eq!(path_for(reclassified), path_for(SqlType::Clob));
    assert_eq!(path_for(reclassified), CoercionPath::LargeText);
}

#[test]
fn sqlite_declared_type_replaces_reported_type() {
    let driver = MemoryDriver::new(SQLITE).with_result(
        "SELECT amount, created FROM t",
        MemoryResult::new(vec![
            ColumnMeta::new("amount", SqlType::Decimal),
            ColumnMeta::new("created", SqlType::Date),
        ])
        .row(vec![
            Cell::new(SqlType::Integer, RawCell::Integer(10)),
            Cell::new(SqlType::Date, RawCell::Text("2013-05-01 10:20:30".into())),
        ]),
    );
    let mut conn = connect(driver);
    let result = conn.execute_query("SELECT amount, created FROM t").unwrap();
    assert_eq!(
        result.rows,
        vec![vec![
            Value::Decimal("10".into()),
            Value::Text("2013-05-01 10:20:30".into())
        ]]
    );
}

#[test]
fn generic_date_parsed() {
    let driver = MemoryDriver::new("memdb").with_result(
        "SELECT d FROM t",
        single_value("d", SqlType::Date, RawCell::Text("2013-05-01".into())),
    );
    let mut conn = connect(driver);
    let result = conn.execute_query("SELECT d FROM t").unwrap();
    assert_eq!(
        result.rows[0][0],
        Value::Date(NaiveDate::from_ymd_opt(2013, 5, 1).unwrap())
    );
}

#[test]
fn identity_statement_value_coerced() {
    let driver = MemoryDriver::new(MSSQL).with_result(
        "SELECT SCOPE_IDENTITY()",
        single_value("", SqlType::Numeric, RawCell::Text("17".into())),
    );
    let journal = driver.journal();
    let mut conn = connect(driver);
    assert_eq!(conn.last_insert_id().unwrap(), Value::Decimal("17".into()));
    assert_eq!(journal.executed(), vec!["SELECT SCOPE_IDENTITY()"]);
    assert_eq!(journal.open_resources(), 0);
}

#[test]
fn sqlite_trusts_generated_keys_regardless_of_driver() {
    let driver = MemoryDriver::new(SQLITE).with_generated_keys(single_value(
        "last_insert_rowid()",
        SqlType::Integer,
        RawCell::Integer(8),
    ));
    let mut conn = connect(driver);
    let keys = conn
        .execute_insert("INSERT INTO t (a) VALUES (1)", KeyShape::Single)
        .unwrap();
    assert_eq!(keys, GeneratedKeys::Single(Value::Integer(8)));
}
