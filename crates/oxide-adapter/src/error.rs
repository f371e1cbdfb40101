//! Error types for the adapter layer.

use thiserror::Error;
use tracing::warn;

use crate::driver::DriverFailure;

/// Errors surfaced to the mapping layer.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A native driver failure, carrying the driver's own diagnostic.
    #[error("driver error: {message}")]
    Driver {
        /// The driver's diagnostic message.
        message: String,
        /// Vendor error code, when the driver reports one.
        code: Option<i32>,
    },

    /// The caller violated the connection protocol (unknown savepoint,
    /// malformed qualified name, ...).
    #[error("{0}")]
    State(String),

    /// Driver metadata returned a null or invalid table name.
    #[error(
        "got null name while matching table(s): [{}.{}.{}] {hint}",
        display_part(.catalog),
        display_part(.schema),
        display_part(.table)
    )]
    AmbiguousMetadata {
        /// Catalog filter of the scan.
        catalog: Option<String>,
        /// Schema filter of the scan.
        schema: Option<String>,
        /// Table-name pattern of the scan.
        table: Option<String>,
        /// Dialect-specific advice on how this usually happens.
        hint: String,
    },

    /// A recognized configuration key carries a value of the wrong shape.
    #[error("invalid configuration value for '{key}': {message}")]
    Configuration {
        /// The offending key.
        key: String,
        /// What was wrong with it.
        message: String,
    },
}

impl AdapterError {
    /// Creates a [`AdapterError::State`] error.
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Creates a [`AdapterError::Driver`] error that did not originate in
    /// the native driver (e.g. a value that could not be coerced).
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
            code: None,
        }
    }

    /// Creates a [`AdapterError::Configuration`] error.
    pub fn configuration(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for wrapped native driver failures.
    #[must_use]
    pub const fn is_driver(&self) -> bool {
        matches!(self, Self::Driver { .. })
    }
}

impl From<DriverFailure> for AdapterError {
    fn from(failure: DriverFailure) -> Self {
        warn!(code = ?failure.code, "driver failure: {}", failure.message);
        Self::Driver {
            message: failure.message,
            code: failure.code,
        }
    }
}

fn display_part(part: &Option<String>) -> &str {
    part.as_deref().unwrap_or("null")
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_failure_keeps_message_and_code() {
        let err: AdapterError = DriverFailure::with_code("disk I/O error", 10).into();
        match err {
            AdapterError::Driver { message, code } => {
                assert_eq!(message, "disk I/O error");
                assert_eq!(code, Some(10));
            }
            other => panic!("expected driver error, got {other:?}"),
        }
    }

    #[test]
    fn test_ambiguous_metadata_message() {
        let err = AdapterError::AmbiguousMetadata {
            catalog: None,
            schema: Some("dbo".into()),
            table: Some("users%".into()),
            hint: "check diagnostics".into(),
        };
        assert_eq!(
            err.to_string(),
            "got null name while matching table(s): [null.dbo.users%] check diagnostics"
        );
    }

    #[test]
    fn test_configuration_message() {
        let err = AdapterError::configuration("savepoints", "expected a boolean");
        assert_eq!(
            err.to_string(),
            "invalid configuration value for 'savepoints': expected a boolean"
        );
    }
}
