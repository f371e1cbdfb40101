//! Vendor dialects.
//!
//! A [`Dialect`] is the set of override points a vendor may specialize. Every
//! hook has an ANSI-ish default, so a dialect only implements what its vendor
//! does differently. Dialects are stateless and shared behind an [`Arc`];
//! the [`DialectRegistry`] maps configuration identifiers and driver names
//! to them once, when a connection is constructed.

mod db2;
mod generic;
mod mssql;
mod sqlite;

use std::fmt;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

pub use db2::Db2Dialect;
pub use generic::GenericDialect;
pub use mssql::MssqlDialect;
pub use sqlite::SqliteDialect;

use crate::coerce;
use crate::descriptor::QualifiedTableName;
use crate::driver::{ColumnMeta, DriverFailure, RawCell};
use crate::error::{AdapterError, Result};
use crate::types::SqlType;
use crate::value::Value;

/// Prefixes of statements that only read.
pub(crate) const READ_ONLY_KEYWORDS: &[&str] = &["SELECT", "WITH", "SHOW", "EXPLAIN"];

/// Prefixes of procedure calls.
pub(crate) const CALL_KEYWORDS: &[&str] = &["CALL", "{CALL"];

/// Trait for vendor-specific connection behavior.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Returns the dialect identifier.
    fn name(&self) -> &'static str;

    /// Object kinds listed as tables.
    fn table_types(&self) -> &'static [&'static str] {
        &["TABLE", "VIEW"]
    }

    /// Whether the vendor has first-class schema namespacing.
    fn supports_schemas(&self) -> bool {
        false
    }

    /// Schemas hidden from table listings unless asked for explicitly.
    fn system_schemas(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether `schema` is one of [`Dialect::system_schemas`], compared
    /// case-insensitively.
    fn is_system_schema(&self, schema: &str) -> bool {
        self.system_schemas()
            .iter()
            .any(|s| s.eq_ignore_ascii_case(schema))
    }

    /// Whether a result column is bookkeeping introduced by the dialect
    /// itself (e.g. a paging row number) and must not reach callers.
    fn is_synthetic_column(&self, name: &str) -> bool {
        let _ = name;
        false
    }

    /// Picks the type a cell is coerced as. Drivers that report the
    /// current row's type instead of the column's are corrected here.
    fn resolve_type(&self, reported: SqlType, column: &ColumnMeta) -> SqlType {
        let _ = column;
        reported
    }

    /// Treats one declared type as another for coercion only.
    fn reclassify(&self, sql_type: SqlType) -> SqlType {
        sql_type
    }

    /// Coerces a cell whose type has already been resolved.
    fn coerce_value(&self, sql_type: SqlType, raw: RawCell) -> Result<Value> {
        coerce::coerce(self.reclassify(sql_type), raw)
    }

    /// Converts an identifier from the vendor's stored case to the
    /// caller's.
    fn case_for_caller(&self, value: &str) -> String {
        value.to_string()
    }

    /// Converts an identifier from the caller's case to the vendor's
    /// stored case.
    fn case_for_driver(&self, value: &str) -> String {
        value.to_string()
    }

    /// Normalizes a table name returned by a table listing.
    fn normalize_table_name(&self, name: &str) -> String {
        self.case_for_caller(name)
    }

    /// Resolves the caller's table argument into the triple handed to
    /// driver metadata scans.
    ///
    /// A `schema.name` argument overrides `schema`. Without schema support
    /// a two-part name qualifies the catalog instead.
    fn extract_table_name(&self, table: &str, schema: Option<&str>) -> Result<QualifiedTableName> {
        let mut parsed = QualifiedTableName::parse(table)?;
        if parsed.schema.is_none() {
            parsed.schema = schema.map(str::to_string);
        }
        if !self.supports_schemas() && parsed.catalog.is_none() {
            parsed.catalog = parsed.schema.take();
        }
        Ok(QualifiedTableName {
            catalog: parsed.catalog.map(|c| self.case_for_driver(&c)),
            schema: parsed.schema.map(|s| self.case_for_driver(&s)),
            name: self.case_for_driver(&parsed.name),
        })
    }

    /// Whether an index scan failure really means "the table has no
    /// indexes".
    fn is_benign_index_failure(&self, failure: &DriverFailure) -> bool {
        let _ = failure;
        false
    }

    /// Whether column listings always compute primary key membership.
    fn always_mark_primary_keys(&self) -> bool {
        false
    }

    /// Whether generated keys can be read back from a statement, given
    /// what the driver itself claims.
    fn supports_generated_keys(&self, driver_claims: bool) -> bool {
        driver_claims
    }

    /// Statement returning the last identity value of this session.
    fn identity_sql(&self) -> Option<&'static str> {
        None
    }

    /// Whether `sql` only reads.
    fn is_select(&self, sql: &str) -> bool {
        READ_ONLY_KEYWORDS
            .iter()
            .any(|kw| starts_with_keyword(sql, kw))
    }

    /// Whether `sql` calls a stored procedure.
    fn is_exec(&self, sql: &str) -> bool {
        CALL_KEYWORDS.iter().any(|kw| starts_with_keyword(sql, kw))
    }

    /// Quotes one identifier part.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quotes a possibly qualified table name part by part.
    fn quote_table_name(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quotes a string literal.
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Literal for boolean true.
    fn quoted_true(&self) -> &'static str {
        "TRUE"
    }

    /// Literal for boolean false.
    fn quoted_false(&self) -> &'static str {
        "FALSE"
    }

    /// SQL creating a savepoint when the driver has no savepoint API.
    fn savepoint_sql(&self, name: &str) -> String {
        format!("SAVEPOINT {name}")
    }

    /// SQL rolling back to a savepoint when the driver has no savepoint
    /// API.
    fn rollback_savepoint_sql(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {name}")
    }

    /// SQL releasing a savepoint when the driver has no savepoint API;
    /// `None` when the vendor has no such statement.
    fn release_savepoint_sql(&self, name: &str) -> Option<String> {
        Some(format!("RELEASE SAVEPOINT {name}"))
    }

    /// Whether the driver's own release call works for savepoints created
    /// through its API. When it does not, release only forgets the entry.
    fn native_release_supported(&self, driver_name: &str) -> bool {
        let _ = driver_name;
        true
    }

    /// Advice attached to [`AdapterError::AmbiguousMetadata`].
    fn metadata_hint(&self) -> &'static str {
        "check if a diagnostic or explain mode was active on this session"
    }
}

/// Case-insensitive keyword prefix test. Leading whitespace and opening
/// parentheses are skipped; the keyword must end at a word boundary.
#[must_use]
pub fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    let rest = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let Some(head) = rest.get(..keyword.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(keyword) {
        return false;
    }
    !rest[keyword.len()..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

struct Registration {
    ids: Vec<String>,
    driver_pattern: Option<Regex>,
    dialect: Arc<dyn Dialect>,
}

/// Maps dialect identifiers and driver names to dialects.
pub struct DialectRegistry {
    registrations: Vec<Registration>,
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.registrations.iter().map(|r| &r.ids))
            .finish()
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DialectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Creates a registry with every dialect shipped in this crate.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .register(&["db2", "as400"], Some(r"\bdb2\b|as/?400"), Db2Dialect::new())
            .and_then(|r| {
                r.register(
                    &["mssql", "sqlserver", "jtds"],
                    Some(r"sql\s*server|jtds"),
                    MssqlDialect::new(),
                )
            })
            .and_then(|r| r.register(&["sqlite", "sqlite3"], Some(r"sqlite"), SqliteDialect::new()))
            .and_then(|r| r.register(&["generic"], None, GenericDialect::new()))
            .expect("builtin driver patterns are valid");
        registry
    }

    /// Registers a dialect under one or more identifiers, optionally with a
    /// case-insensitive pattern matched against driver names.
    pub fn register(
        &mut self,
        ids: &[&str],
        driver_pattern: Option<&str>,
        dialect: impl Dialect + 'static,
    ) -> Result<&mut Self> {
        let driver_pattern = driver_pattern
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| AdapterError::configuration("driver_pattern", e.to_string()))
            })
            .transpose()?;
        self.registrations.push(Registration {
            ids: ids.iter().map(|id| id.to_ascii_lowercase()).collect(),
            driver_pattern,
            dialect: Arc::new(dialect),
        });
        Ok(self)
    }

    /// Looks a dialect up by identifier, case-insensitively.
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Dialect>> {
        let wanted = id.to_ascii_lowercase();
        self.registrations
            .iter()
            .find(|r| r.ids.contains(&wanted))
            .map(|r| Arc::clone(&r.dialect))
            .ok_or_else(|| {
                AdapterError::configuration("adapter", format!("unknown adapter: '{id}'"))
            })
    }

    /// Finds the dialect whose driver pattern matches `driver_name`.
    #[must_use]
    pub fn detect(&self, driver_name: &str) -> Option<Arc<dyn Dialect>> {
        self.registrations
            .iter()
            .find(|r| {
                r.driver_pattern
                    .as_ref()
                    .is_some_and(|p| p.is_match(driver_name))
            })
            .map(|r| Arc::clone(&r.dialect))
    }

    /// Registered identifiers, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.registrations
            .iter()
            .flat_map(|r| r.ids.iter().map(String::as_str))
    }
}
