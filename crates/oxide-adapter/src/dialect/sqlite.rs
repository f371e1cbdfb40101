//! SQLite dialect.

use super::Dialect;
use crate::descriptor::QualifiedTableName;
use crate::driver::{ColumnMeta, DriverFailure, RawCell};
use crate::error::Result;
use crate::types::SqlType;
use crate::value::Value;

/// Message prefix of the failure some drivers raise when asked for the
/// indexes of a table that has none.
const NO_INDEXES_FAILURE: &str = "[SQLITE_ERROR] SQL error or missing database";

/// SQLite dialect.
///
/// SQLite drivers report the type of the current row's value rather than
/// the column's declared type, and report `DATE` for `DATETIME` columns.
/// Both are corrected here. Drivers also ignore the schema argument of
/// metadata calls, so a schema is folded into the table name.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn resolve_type(&self, reported: SqlType, column: &ColumnMeta) -> SqlType {
        match column.sql_type {
            // expression columns have no declared type
            SqlType::Null => reported,
            declared => declared,
        }
    }

    fn coerce_value(&self, sql_type: SqlType, raw: RawCell) -> Result<Value> {
        match sql_type {
            SqlType::Date => crate::coerce::coerce(SqlType::Varchar, raw),
            other => crate::coerce::coerce(self.reclassify(other), raw),
        }
    }

    fn normalize_table_name(&self, name: &str) -> String {
        name.to_lowercase()
    }

    fn extract_table_name(&self, table: &str, schema: Option<&str>) -> Result<QualifiedTableName> {
        let parsed = QualifiedTableName::parse(table)?;
        let schema = parsed.schema.or_else(|| schema.map(str::to_string));
        Ok(QualifiedTableName {
            catalog: parsed.catalog,
            schema: None,
            name: match schema {
                Some(schema) => format!("{schema}.{}", parsed.name),
                None => parsed.name,
            },
        })
    }

    fn is_benign_index_failure(&self, failure: &DriverFailure) -> bool {
        failure.message.starts_with(NO_INDEXES_FAILURE)
    }

    // The driver does not claim support, yet returns them.
    fn supports_generated_keys(&self, _driver_claims: bool) -> bool {
        true
    }

    fn identity_sql(&self) -> Option<&'static str> {
        Some("SELECT last_insert_rowid()")
    }
}
