//! Dialect-aware connection adapter for SQL databases.
//!
//! `oxide-adapter` sits between a mapping layer and the native drivers of
//! several SQL databases and hides their quirks behind one contract:
//!
//! - **Connection** - runs statements on one live driver session, releasing
//!   every statement and cursor on all exit paths
//! - **Coercion** - maps driver cells onto host [`Value`]s, letting dialects
//!   re-resolve or reclassify ambiguous type codes
//! - **Savepoints** - named savepoints through the driver API when it has
//!   one, emulated with plain SQL otherwise
//! - **Introspection** - tables, columns and indexes as normalized
//!   descriptors
//! - **Dialects** - DB2, SQL Server and SQLite specializations of all of the
//!   above, resolved once per connection by [`DialectRegistry`]
//!
//! # Example
//!
//! ```rust
//! use oxide_adapter::prelude::*;
//! use oxide_adapter::memory::{MemoryDriver, MemoryResult};
//!
//! let driver = MemoryDriver::new("SQLite JDBC").with_result(
//!     "SELECT last_insert_rowid()",
//!     MemoryResult::new(vec![ColumnMeta::new("id", SqlType::Integer)])
//!         .row(vec![Cell::new(SqlType::Integer, RawCell::Integer(3))]),
//! );
//! let mut conn = Connection::new(driver, AdapterConfig::new()).unwrap();
//! assert_eq!(conn.dialect().name(), "sqlite");
//!
//! conn.create_savepoint("before_import").unwrap();
//! conn.release_savepoint("before_import").unwrap();
//!
//! assert_eq!(conn.last_insert_id().unwrap(), Value::Integer(3));
//! ```

pub mod coerce;
pub mod config;
pub mod connection;
pub mod descriptor;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod introspect;
pub mod memory;
pub mod savepoint;
pub mod types;
pub mod value;

pub use config::AdapterConfig;
pub use connection::Connection;
pub use dialect::{Dialect, DialectRegistry};
pub use error::{AdapterError, Result};
pub use value::Value;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::AdapterConfig;
    pub use crate::connection::{Connection, CursorGuard, Session, StatementGuard};
    pub use crate::descriptor::{
        ColumnDescriptor, GeneratedKeys, IndexDescriptor, KeyShape, QualifiedTableName,
        QueryResult, ResultColumn,
    };
    pub use crate::dialect::{
        Db2Dialect, Dialect, DialectRegistry, GenericDialect, MssqlDialect, SqliteDialect,
    };
    pub use crate::driver::{
        Capability, Cell, ColumnMeta, ColumnRow, Cursor, Driver, DriverFailure, DriverResult,
        IndexRow, NativeSavepoint, RawCell, Statement, TableFilter, TableRow,
    };
    pub use crate::error::{AdapterError, Result};
    pub use crate::introspect::TableQuery;
    pub use crate::savepoint::{CapabilityCache, SavepointEntry, SavepointStack};
    pub use crate::types::SqlType;
    pub use crate::value::Value;
}
