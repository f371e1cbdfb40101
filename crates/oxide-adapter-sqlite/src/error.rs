//! Error types for the SQLite driver.

use oxide_adapter::driver::DriverFailure;

/// Errors raised while opening a session.
#[derive(Debug, thiserror::Error)]
pub enum SqliteDriverError {
    /// The database could not be opened.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The runtime driving the connection could not be started.
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Result type for opening a session.
pub type Result<T> = std::result::Result<T, SqliteDriverError>;

/// Primary SQLite result codes and the descriptions the SQLite JDBC driver
/// prefixes its messages with.
const RESULT_CODES: &[(i32, &str, &str)] = &[
    (1, "SQLITE_ERROR", "SQL error or missing database"),
    (5, "SQLITE_BUSY", "The database file is locked"),
    (6, "SQLITE_LOCKED", "A table in the database is locked"),
    (8, "SQLITE_READONLY", "Attempt to write a readonly database"),
    (11, "SQLITE_CORRUPT", "The database disk image is malformed"),
    (14, "SQLITE_CANTOPEN", "Unable to open the database file"),
    (19, "SQLITE_CONSTRAINT", "Abort due to constraint violation"),
];

/// Converts a sqlx error into a driver failure.
///
/// Database errors carry the extended result code and a message of the form
/// `[SQLITE_ERROR] SQL error or missing database (no such table: t)`, which
/// is what the SQLite dialect's failure signatures match.
pub(crate) fn failure(err: sqlx::Error) -> DriverFailure {
    let sqlx::Error::Database(db) = &err else {
        return DriverFailure::new(err.to_string());
    };
    let Some(code) = db.code().and_then(|c| c.parse::<i32>().ok()) else {
        return DriverFailure::new(db.message());
    };
    let message = RESULT_CODES
        .iter()
        .find(|(primary, _, _)| *primary == code & 0xff)
        .map_or_else(
            || db.message().to_string(),
            |(_, name, description)| format!("[{name}] {description} ({})", db.message()),
        );
    DriverFailure::with_code(message, code)
}

/// The failure returned once the session has been closed.
pub(crate) fn closed() -> DriverFailure {
    DriverFailure::new("[SQLITE_MISUSE] connection is closed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_error_keeps_message() {
        let failure = failure(sqlx::Error::RowNotFound);
        assert_eq!(failure.code, None);
        assert!(!failure.message.is_empty());
    }

    #[test]
    fn test_closed() {
        assert!(closed().message.contains("closed"));
    }
}
