#![allow(dead_code)]

use oxide_adapter::memory::{MemoryDriver, MemoryResult};
use oxide_adapter::prelude::*;

pub const SQLITE: &str = "SQLite JDBC";
pub const JTDS: &str = "jTDS Type 4 JDBC Driver for MS SQL Server and Sybase";
pub const MSSQL: &str = "Microsoft JDBC Driver 4.0 for SQL Server";
pub const DB2: &str = "IBM Data Server Driver for JDBC and SQLJ (DB2)";

pub fn connect(driver: MemoryDriver) -> Connection {
    Connection::new(driver, AdapterConfig::new())
        .unwrap_or_else(|e| panic!("Failed to connect: {e}"))
}

pub fn connect_with(driver: MemoryDriver, config: AdapterConfig) -> Connection {
    Connection::new(driver, config).unwrap_or_else(|e| panic!("Failed to connect: {e}"))
}

pub fn table(schema: Option<&str>, name: Option<&str>) -> TableRow {
    TableRow {
        catalog: None,
        schema: schema.map(str::to_string),
        name: name.map(str::to_string),
        kind: Some("TABLE".to_string()),
    }
}

pub fn column(name: &str, sql_type: SqlType, type_name: &str) -> ColumnRow {
    ColumnRow {
        name: name.to_string(),
        sql_type,
        type_name: type_name.to_string(),
        precision: None,
        scale: None,
        nullable: true,
        default: None,
    }
}

pub fn index_row(table: &str, index: Option<&str>, column: &str, non_unique: bool) -> IndexRow {
    IndexRow {
        table_name: Some(table.to_string()),
        index_name: index.map(str::to_string),
        non_unique,
        column_name: Some(column.to_string()),
    }
}

pub fn single_value(column: &str, sql_type: SqlType, raw: RawCell) -> MemoryResult {
    MemoryResult::new(vec![ColumnMeta::new(column, sql_type)]).row(vec![Cell::new(sql_type, raw)])
}

pub fn assert_state_error(err: &AdapterError, expected: &str) {
    match err {
        AdapterError::State(message) => assert_eq!(message, expected),
        other => panic!("Expected state error '{expected}', got {other:?}"),
    }
}
