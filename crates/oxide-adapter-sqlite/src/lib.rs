//! SQLite driver for `oxide-adapter`.
//!
//! [`SqliteDriver`] implements the adapter's blocking [`Driver`] seam on top
//! of a single `sqlx` connection. Metadata scans read `sqlite_master` and
//! the `table_info` / `index_list` / `index_info` pragmas; savepoints have
//! no driver API here, so connections emulate them with plain SQL.
//!
//! # Example
//!
//! ```rust
//! use oxide_adapter::prelude::*;
//! use oxide_adapter_sqlite::SqliteDriver;
//!
//! let driver = SqliteDriver::memory().unwrap();
//! let mut conn = Connection::new(driver, AdapterConfig::new()).unwrap();
//! conn.execute_update("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
//!     .unwrap();
//! let keys = conn
//!     .execute_insert("INSERT INTO users (name) VALUES ('alice')", KeyShape::Single)
//!     .unwrap();
//! assert_eq!(keys, GeneratedKeys::Single(Value::Integer(1)));
//! ```
//!
//! [`Driver`]: oxide_adapter::driver::Driver

mod driver;
pub mod error;

pub use driver::{SqliteDriver, DRIVER_NAME};
pub use error::{Result, SqliteDriverError};
