//! The native driver seam.
//!
//! A [`Driver`] is one live, already-open database session. The adapter
//! never opens or pools sessions itself; it drives whatever the caller hands
//! it through this trait. Everything is synchronous: a statement blocks until
//! the driver returns.
//!
//! Statements and cursors borrow from the session that created them, so a
//! session cannot be used for anything else while one of them is open. The
//! connection layer wraps both in guards that call `close` on every exit
//! path.

use thiserror::Error;

use crate::descriptor::QualifiedTableName;
use crate::types::SqlType;

/// A failure reported by the native driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverFailure {
    pub message: String,
    pub code: Option<i32>,
}

impl DriverFailure {
    /// Creates a failure without a vendor code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Creates a failure with a vendor code.
    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    /// The failure returned for optional APIs a driver does not implement.
    pub fn unsupported(feature: &str) -> Self {
        Self::new(format!("{feature} is not supported by this driver"))
    }
}

/// Result type for native driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverFailure>;

/// One cell as handed over by the driver, before coercion.
///
/// Text may arrive either already decoded or as raw bytes; which one is the
/// driver's choice, decoding is the coercion engine's job.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    /// Decoded character data.
    Text(String),
    /// Undecoded bytes (binary data, or text the driver did not decode).
    Bytes(Vec<u8>),
}

/// A cell together with the type the driver reported for it.
///
/// Some drivers report the type of the current row's value rather than
/// the column's declared type; dialects may re-resolve it against
/// [`ColumnMeta`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub reported: SqlType,
    pub raw: RawCell,
}

impl Cell {
    /// Creates a cell.
    #[must_use]
    pub const fn new(reported: SqlType, raw: RawCell) -> Self {
        Self { reported, raw }
    }

    /// Creates a `NULL` cell.
    #[must_use]
    pub const fn null(reported: SqlType) -> Self {
        Self::new(reported, RawCell::Null)
    }
}

/// Result-set column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    /// The column's declared type.
    pub sql_type: SqlType,
}

impl ColumnMeta {
    /// Creates column metadata.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// Optional features whose presence is detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Named savepoints through the driver's own API.
    NativeSavepoints,
}

/// Opaque handle to a savepoint created through the driver's API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSavepoint {
    pub id: u64,
    pub name: Option<String>,
}

/// Filters for a table metadata scan. `None` means "any".
#[derive(Debug, Clone, Copy, Default)]
pub struct TableFilter<'a> {
    pub catalog: Option<&'a str>,
    pub schema_pattern: Option<&'a str>,
    pub table_pattern: Option<&'a str>,
    pub types: &'a [&'a str],
}

/// A row of a table metadata scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
}

/// A row of a column metadata scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    pub name: String,
    pub sql_type: SqlType,
    pub type_name: String,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub default: Option<String>,
}

/// A row of an index metadata scan: one column of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub table_name: Option<String>,
    pub index_name: Option<String>,
    pub non_unique: bool,
    pub column_name: Option<String>,
}

/// A statement created by a [`Driver`].
pub trait Statement {
    /// Enables or disables driver-side escape processing.
    fn set_escape_processing(&mut self, enabled: bool) -> DriverResult<()>;

    /// Executes a statement that returns no rows; returns the update count.
    fn execute_update(&mut self, sql: &str) -> DriverResult<u64>;

    /// Executes a query and opens a cursor over its rows.
    fn execute_query(&mut self, sql: &str) -> DriverResult<Box<dyn Cursor + '_>>;

    /// Opens a cursor over the keys generated by the last update.
    fn generated_keys(&mut self) -> DriverResult<Box<dyn Cursor + '_>> {
        Err(DriverFailure::unsupported("generated keys"))
    }

    /// Releases driver resources. Must be idempotent.
    fn close(&mut self);
}

/// A forward-only cursor over result rows.
pub trait Cursor {
    /// Result columns, in order.
    fn columns(&self) -> &[ColumnMeta];

    /// Advances to the next row.
    fn next_row(&mut self) -> DriverResult<Option<Vec<Cell>>>;

    /// Releases driver resources. Must be idempotent.
    fn close(&mut self);
}

/// One open native database session.
pub trait Driver {
    /// The driver's self-reported name, e.g. `SQLite JDBC` or
    /// `jTDS Type 4 JDBC Driver for MS SQL Server and Sybase`.
    fn name(&self) -> &str;

    /// Whether the session has been closed underneath us.
    fn is_closed(&self) -> bool {
        false
    }

    /// Creates a statement on this session.
    fn create_statement(&mut self) -> DriverResult<Box<dyn Statement + '_>>;

    /// Whether each statement commits on its own.
    fn auto_commit(&self) -> bool;

    /// Switches autocommit on or off.
    fn set_auto_commit(&mut self, enabled: bool) -> DriverResult<()>;

    /// Whether the driver claims to return generated keys.
    fn supports_generated_keys(&self) -> bool {
        false
    }

    /// Attempts to resolve an optional capability. Returns `false` when the
    /// driver implementation lacks it.
    fn probe(&self, capability: Capability) -> bool;

    /// Creates a named savepoint through the driver API.
    fn set_savepoint(&mut self, name: &str) -> DriverResult<NativeSavepoint> {
        let _ = name;
        Err(DriverFailure::unsupported("savepoints"))
    }

    /// Rolls back to a savepoint through the driver API.
    fn rollback_to_savepoint(&mut self, savepoint: &NativeSavepoint) -> DriverResult<()> {
        let _ = savepoint;
        Err(DriverFailure::unsupported("savepoints"))
    }

    /// Releases a savepoint through the driver API.
    fn release_savepoint(&mut self, savepoint: &NativeSavepoint) -> DriverResult<()> {
        let _ = savepoint;
        Err(DriverFailure::unsupported("savepoints"))
    }

    /// Scans table metadata.
    fn tables(&mut self, filter: &TableFilter<'_>) -> DriverResult<Vec<TableRow>>;

    /// Scans column metadata of one table, in ordinal order.
    fn columns(&mut self, table: &QualifiedTableName) -> DriverResult<Vec<ColumnRow>>;

    /// Returns the primary key column names of one table, in key order.
    fn primary_keys(&mut self, table: &QualifiedTableName) -> DriverResult<Vec<String>>;

    /// Scans index metadata of one table, ordered by index name and then
    /// by column position within the index.
    fn index_info(&mut self, table: &QualifiedTableName) -> DriverResult<Vec<IndexRow>>;
}
