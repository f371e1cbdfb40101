//! Value objects describing tables, columns, indexes and query results.
//!
//! All descriptors are scoped to one connection session; they are plain
//! data and never hold driver resources.

use std::fmt;

use serde::Serialize;

use crate::error::{AdapterError, Result};
use crate::types::SqlType;
use crate::value::Value;

/// A catalog/schema/name triple identifying a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedTableName {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
}

impl QualifiedTableName {
    /// Creates an unqualified table name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            name: name.into(),
        }
    }

    /// Sets the schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Parses a dotted identifier.
    ///
    /// `name` yields only a name, `schema.name` a schema and a name (no
    /// catalog), and `catalog.schema.name` all three. More than two dots is
    /// an error.
    pub fn parse(dotted: &str) -> Result<Self> {
        let parts: Vec<&str> = dotted.split('.').collect();
        match parts.as_slice() {
            [name] => Ok(Self::new(*name)),
            [schema, name] => Ok(Self::new(*name).with_schema(*schema)),
            [catalog, schema, name] => Ok(Self::new(*name)
                .with_schema(*schema)
                .with_catalog(*catalog)),
            _ => Err(AdapterError::state(format!(
                "table name: {dotted} should not contain more than 2 '.'"
            ))),
        }
    }
}

impl fmt::Display for QualifiedTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(catalog) = &self.catalog {
            write!(f, "{catalog}.")?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        f.write_str(&self.name)
    }
}

/// Describes one table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: SqlType,
    /// The vendor's own type name, e.g. `varchar(255)`.
    pub type_name: String,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub default: Option<String>,
    pub primary_key: bool,
}

/// Describes one secondary index.
///
/// Columns that belong to the table's primary key are never listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDescriptor {
    pub table_name: String,
    pub index_name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// A column of a query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultColumn {
    pub name: String,
    pub sql_type: SqlType,
}

/// Rows returned by a query, coerced into host values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Returns the index of the column with the given name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Shape of generated keys the caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    /// Only the first key of the first row.
    Single,
    /// The first column of every generated row.
    All,
}

/// Keys produced by an insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeneratedKeys {
    Single(Value),
    Many(Vec<Value>),
}

impl GeneratedKeys {
    /// Returns the single identity value, or the first of many.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        match self {
            Self::Single(v) => Some(v),
            Self::Many(vs) => vs.first(),
        }
    }
}
