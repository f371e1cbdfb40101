//! Adapter configuration.
//!
//! The configuration is a flat map of options, typically the database
//! section of the host application's settings. Keys this crate knows are
//! typed; every other key is kept and ignored. A known key carrying a value
//! of the wrong shape is a [`AdapterError::Configuration`].

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::{AdapterError, Result};

const KNOWN_KEYS: &[(&str, Shape)] = &[
    ("adapter", Shape::String),
    ("statement_escape_processing", Shape::Bool),
    ("savepoints", Shape::Bool),
];

#[derive(Clone, Copy)]
enum Shape {
    String,
    Bool,
}

/// Options understood by the adapter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdapterConfig {
    /// Dialect identifier, e.g. `sqlite3` or `mssql`. Detected from the
    /// driver name when absent.
    #[serde(default)]
    pub adapter: Option<String>,

    /// Applied to every statement when present; left to the driver
    /// default otherwise.
    #[serde(default)]
    pub statement_escape_processing: Option<bool>,

    /// Operator override for native savepoint API availability.
    #[serde(default)]
    pub savepoints: Option<bool>,

    /// Unrecognized options, retained but never interpreted.
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl AdapterConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dialect identifier.
    #[must_use]
    pub fn adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    /// Sets statement escape processing.
    #[must_use]
    pub const fn statement_escape_processing(mut self, enabled: bool) -> Self {
        self.statement_escape_processing = Some(enabled);
        self
    }

    /// Sets the native savepoint override.
    #[must_use]
    pub const fn savepoints(mut self, native: bool) -> Self {
        self.savepoints = Some(native);
        self
    }

    /// Parses a JSON object.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|e| AdapterError::configuration("<root>", e.to_string()))?;
        match value {
            JsonValue::Object(map) => Self::from_map(map),
            other => Err(AdapterError::configuration(
                "<root>",
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Builds the configuration from an option map.
    pub fn from_map(map: Map<String, JsonValue>) -> Result<Self> {
        for (key, shape) in KNOWN_KEYS {
            if let Some(value) = map.get(*key) {
                check_shape(key, *shape, value)?;
            }
        }
        serde_json::from_value(JsonValue::Object(map))
            .map_err(|e| AdapterError::configuration("<root>", e.to_string()))
    }
}

fn check_shape(key: &str, shape: Shape, value: &JsonValue) -> Result<()> {
    let ok = match (shape, value) {
        (_, JsonValue::Null) | (Shape::String, JsonValue::String(_)) => true,
        (Shape::Bool, JsonValue::Bool(_)) => true,
        _ => false,
    };
    if ok {
        return Ok(());
    }
    let expected = match shape {
        Shape::String => "a string",
        Shape::Bool => "a boolean",
    };
    Err(AdapterError::configuration(
        key,
        format!("expected {expected}, got {value}"),
    ))
}
