//! The base connection.
//!
//! A [`Connection`] owns one live [`Driver`] session and the [`Dialect`]
//! resolved for it. Every statement runs inside [`Connection::execute_scoped`],
//! which hands out a [`Session`] whose statements and cursors are closed when
//! their guards drop, on success and on every error path alike.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::AdapterConfig;
use crate::descriptor::{GeneratedKeys, KeyShape, QueryResult, ResultColumn};
use crate::dialect::{Dialect, DialectRegistry, GenericDialect};
use crate::driver::{Capability, Cell, ColumnMeta, Cursor, Driver, DriverFailure, RawCell, Statement};
use crate::error::{AdapterError, Result};
use crate::savepoint::{validate_savepoint_name, CapabilityCache, SavepointEntry, SavepointStack};
use crate::types::SqlType;
use crate::value::Value;

/// One adapted database session.
pub struct Connection {
    driver: Box<dyn Driver>,
    dialect: Arc<dyn Dialect>,
    config: AdapterConfig,
    savepoints: SavepointStack,
    capabilities: Arc<CapabilityCache>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.driver.name())
            .field("dialect", &self.dialect.name())
            .field("savepoints", &self.savepoints)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Adapts `driver` using the builtin dialects and the process-wide
    /// capability cache.
    pub fn new(driver: impl Driver + 'static, config: AdapterConfig) -> Result<Self> {
        Self::with_registry(
            Box::new(driver),
            config,
            &DialectRegistry::builtin(),
            CapabilityCache::shared(),
        )
    }

    /// Adapts `driver`, resolving its dialect through `registry`.
    ///
    /// The dialect named by `config.adapter` wins; otherwise it is detected
    /// from the driver name, falling back to the generic dialect.
    /// `capabilities` is meant to be shared by every connection of the
    /// process.
    pub fn with_registry(
        driver: Box<dyn Driver>,
        config: AdapterConfig,
        registry: &DialectRegistry,
        capabilities: Arc<CapabilityCache>,
    ) -> Result<Self> {
        let dialect = match config.adapter.as_deref() {
            Some(id) => registry.resolve(id)?,
            None => registry
                .detect(driver.name())
                .or_else(|| registry.resolve("generic").ok())
                .unwrap_or_else(|| Arc::new(GenericDialect::new())),
        };
        info!(
            driver = driver.name(),
            dialect = dialect.name(),
            "connection adapter ready"
        );
        Ok(Self {
            driver,
            dialect,
            config,
            savepoints: SavepointStack::new(),
            capabilities,
        })
    }

    /// The dialect in effect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// The driver's self-reported name.
    #[must_use]
    pub fn driver_name(&self) -> &str {
        self.driver.name()
    }

    /// The configuration this connection was built with.
    #[must_use]
    pub const fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Live savepoints.
    #[must_use]
    pub const fn savepoints(&self) -> &SavepointStack {
        &self.savepoints
    }

    /// Runs `action` against the session. Statements and cursors opened
    /// inside are closed before this returns, whatever the outcome.
    pub fn execute_scoped<T>(
        &mut self,
        action: impl FnOnce(&mut Session<'_>) -> Result<T>,
    ) -> Result<T> {
        if self.driver.is_closed() {
            return Err(DriverFailure::new("connection is closed").into());
        }
        let mut session = Session {
            driver: &mut *self.driver,
            dialect: self.dialect.as_ref(),
            config: &self.config,
        };
        action(&mut session)
    }

    /// Object kinds listed as tables.
    #[must_use]
    pub fn table_types(&self) -> &'static [&'static str] {
        self.dialect.table_types()
    }

    /// Whether the vendor has first-class schemas.
    #[must_use]
    pub fn supports_schemas(&self) -> bool {
        self.dialect.supports_schemas()
    }

    /// Coerces a raw cell of the given declared type.
    pub fn coerce_value(&self, declared: SqlType, raw: RawCell) -> Result<Value> {
        self.dialect.coerce_value(declared, raw)
    }

    /// Coerces one cell of a result column, letting the dialect re-resolve
    /// the type the driver reported for it first.
    pub fn coerce_cell(&self, column: &ColumnMeta, cell: Cell) -> Result<Value> {
        coerce_cell(self.dialect.as_ref(), column, cell)
    }

    /// Converts an identifier from the vendor's case to the caller's.
    #[must_use]
    pub fn case_for_caller(&self, value: &str) -> String {
        self.dialect.case_for_caller(value)
    }

    /// Converts an identifier from the caller's case to the vendor's.
    #[must_use]
    pub fn case_for_driver(&self, value: &str) -> String {
        self.dialect.case_for_driver(value)
    }

    /// Whether `sql` only reads.
    #[must_use]
    pub fn is_select(&self, sql: &str) -> bool {
        self.dialect.is_select(sql)
    }

    /// Whether `sql` calls a stored procedure.
    #[must_use]
    pub fn is_exec(&self, sql: &str) -> bool {
        self.dialect.is_exec(sql)
    }

    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    #[must_use]
    pub fn quote_table_name(&self, name: &str) -> String {
        self.dialect.quote_table_name(name)
    }

    #[must_use]
    pub fn quote_string(&self, value: &str) -> String {
        self.dialect.quote_string(value)
    }

    #[must_use]
    pub fn quoted_bool(&self, value: bool) -> &'static str {
        if value {
            self.dialect.quoted_true()
        } else {
            self.dialect.quoted_false()
        }
    }

    /// Runs a query and coerces every row.
    pub fn execute_query(&mut self, sql: &str) -> Result<QueryResult> {
        self.execute_scoped(|session| session.query(sql))
    }

    /// Runs a statement that returns no rows.
    pub fn execute_update(&mut self, sql: &str) -> Result<u64> {
        self.execute_scoped(|session| session.update(sql))
    }

    /// Returns the identity value generated last in this session, using
    /// the dialect's identity statement.
    pub fn last_insert_id(&mut self) -> Result<Value> {
        self.execute_scoped(|session| session.identity())
            .inspect_err(|e| warn!(error = %e, "failed to get generated keys"))
    }

    /// Runs an insert and returns the keys it generated.
    ///
    /// The driver's generated keys are used when the dialect trusts them,
    /// the dialect's identity statement otherwise.
    pub fn execute_insert(&mut self, sql: &str, shape: KeyShape) -> Result<GeneratedKeys> {
        self.execute_scoped(|session| session.insert(sql, shape))
            .inspect_err(|e| warn!(error = %e, "failed to get generated keys"))
    }

    /// Whether savepoints go through the driver API. The configured
    /// override wins over the shared capability cache.
    fn native_savepoints(&self) -> bool {
        self.config.savepoints.unwrap_or_else(|| {
            self.capabilities
                .supports(self.driver.as_ref(), Capability::NativeSavepoints)
        })
    }

    /// Creates a named savepoint.
    ///
    /// Without a native savepoint API, autocommit is switched off and the
    /// dialect's savepoint statement is issued.
    pub fn create_savepoint(&mut self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        if self.savepoints.contains(name) {
            return Err(AdapterError::state(format!(
                "could not create savepoint: '{name}' (already set)"
            )));
        }
        let native = if self.native_savepoints() {
            Some(self.driver.set_savepoint(name)?)
        } else {
            self.driver.set_auto_commit(false)?;
            let sql = self.dialect.savepoint_sql(name);
            self.execute_update(&sql)?;
            None
        };
        debug!(savepoint = name, native = native.is_some(), "savepoint created");
        self.savepoints.push(SavepointEntry {
            name: name.to_string(),
            native,
        })
    }

    /// Rolls back to a live savepoint. Savepoints created after it are
    /// forgotten; the savepoint itself stays live.
    pub fn rollback_savepoint(&mut self, name: &str) -> Result<()> {
        let entry = self.savepoints.get(name).cloned().ok_or_else(|| {
            AdapterError::state(format!("could not rollback savepoint: '{name}' (not set)"))
        })?;
        match &entry.native {
            Some(handle) => self.driver.rollback_to_savepoint(handle)?,
            None => {
                let sql = self.dialect.rollback_savepoint_sql(name);
                self.execute_update(&sql)?;
            }
        }
        debug!(savepoint = name, "rolled back to savepoint");
        self.savepoints.truncate_after(name);
        Ok(())
    }

    /// Releases a live savepoint together with every savepoint created
    /// after it.
    pub fn release_savepoint(&mut self, name: &str) -> Result<()> {
        let entry = self.savepoints.get(name).cloned().ok_or_else(|| {
            AdapterError::state(format!("could not release savepoint: '{name}' (not set)"))
        })?;
        match &entry.native {
            Some(handle) => {
                if self.dialect.native_release_supported(self.driver.name()) {
                    self.driver.release_savepoint(handle)?;
                }
            }
            None => {
                if let Some(sql) = self.dialect.release_savepoint_sql(name) {
                    self.execute_update(&sql)?;
                }
            }
        }
        debug!(savepoint = name, "savepoint released");
        self.savepoints.remove(name);
        Ok(())
    }
}

/// Scoped access to the driver session.
pub struct Session<'c> {
    pub(crate) driver: &'c mut dyn Driver,
    pub(crate) dialect: &'c dyn Dialect,
    config: &'c AdapterConfig,
}

impl Session<'_> {
    /// The dialect in effect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect
    }

    /// Creates a statement, applying the configured escape processing.
    pub fn create_statement(&mut self) -> Result<StatementGuard<'_>> {
        open_statement(&mut *self.driver, self.config)
    }

    /// Runs a query and coerces every row.
    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        debug!(sql, "executing query");
        let dialect = self.dialect;
        let mut statement = open_statement(&mut *self.driver, self.config)?;
        let mut cursor = statement.execute_query(sql)?;
        collect_rows(dialect, &mut cursor)
    }

    /// Runs a statement that returns no rows.
    pub fn update(&mut self, sql: &str) -> Result<u64> {
        debug!(sql, "executing update");
        let mut statement = open_statement(&mut *self.driver, self.config)?;
        statement.execute_update(sql)
    }

    /// Runs the dialect's identity statement and returns its single value.
    pub fn identity(&mut self) -> Result<Value> {
        let sql = self.dialect.identity_sql().ok_or_else(|| {
            AdapterError::state(format!(
                "{} has no identity statement",
                self.dialect.name()
            ))
        })?;
        let result = self.query(sql)?;
        Ok(first_key(result.rows))
    }

    /// Runs an insert and returns the keys it generated.
    pub fn insert(&mut self, sql: &str, shape: KeyShape) -> Result<GeneratedKeys> {
        let dialect = self.dialect;
        if !dialect.supports_generated_keys(self.driver.supports_generated_keys()) {
            self.update(sql)?;
            return self.identity().map(GeneratedKeys::Single);
        }
        debug!(sql, "executing insert");
        let mut statement = open_statement(&mut *self.driver, self.config)?;
        statement.execute_update(sql)?;
        let mut keys = statement.generated_keys()?;
        let rows = collect_rows(dialect, &mut keys)?.rows;
        Ok(match shape {
            KeyShape::Single => GeneratedKeys::Single(first_key(rows)),
            KeyShape::All => GeneratedKeys::Many(
                rows.into_iter()
                    .filter_map(|row| row.into_iter().next())
                    .collect(),
            ),
        })
    }
}

fn open_statement<'d>(
    driver: &'d mut dyn Driver,
    config: &AdapterConfig,
) -> Result<StatementGuard<'d>> {
    let mut statement = StatementGuard {
        inner: driver.create_statement()?,
    };
    if let Some(enabled) = config.statement_escape_processing {
        statement.inner.set_escape_processing(enabled)?;
    }
    Ok(statement)
}

fn first_key(rows: Vec<Vec<Value>>) -> Value {
    rows.into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .unwrap_or(Value::Absent)
}

fn coerce_cell(dialect: &dyn Dialect, column: &ColumnMeta, cell: Cell) -> Result<Value> {
    let sql_type = dialect.resolve_type(cell.reported, column);
    dialect.coerce_value(sql_type, cell.raw)
}

/// Drains a cursor, dropping synthetic columns.
fn collect_rows(dialect: &dyn Dialect, cursor: &mut CursorGuard<'_>) -> Result<QueryResult> {
    let metas = cursor.columns().to_vec();
    let keep: Vec<bool> = metas
        .iter()
        .map(|m| !dialect.is_synthetic_column(&m.name))
        .collect();
    let columns = metas
        .iter()
        .zip(&keep)
        .filter(|(_, keep)| **keep)
        .map(|(m, _)| ResultColumn {
            name: m.name.clone(),
            sql_type: m.sql_type,
        })
        .collect();
    let mut rows = Vec::new();
    while let Some(cells) = cursor.next_row()? {
        let row = cells
            .into_iter()
            .zip(metas.iter().zip(&keep))
            .filter(|(_, (_, keep))| **keep)
            .map(|(cell, (meta, _))| coerce_cell(dialect, meta, cell))
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }
    Ok(QueryResult { columns, rows })
}

/// A statement that is closed when dropped.
pub struct StatementGuard<'d> {
    inner: Box<dyn Statement + 'd>,
}

impl StatementGuard<'_> {
    pub fn execute_update(&mut self, sql: &str) -> Result<u64> {
        Ok(self.inner.execute_update(sql)?)
    }

    pub fn execute_query(&mut self, sql: &str) -> Result<CursorGuard<'_>> {
        Ok(CursorGuard {
            inner: self.inner.execute_query(sql)?,
        })
    }

    pub fn generated_keys(&mut self) -> Result<CursorGuard<'_>> {
        Ok(CursorGuard {
            inner: self.inner.generated_keys()?,
        })
    }
}

impl Drop for StatementGuard<'_> {
    fn drop(&mut self) {
        self.inner.close();
    }
}

/// A cursor that is closed when dropped.
pub struct CursorGuard<'s> {
    inner: Box<dyn Cursor + 's>,
}

impl CursorGuard<'_> {
    #[must_use]
    pub fn columns(&self) -> &[ColumnMeta] {
        self.inner.columns()
    }

    pub fn next_row(&mut self) -> Result<Option<Vec<Cell>>> {
        Ok(self.inner.next_row()?)
    }
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
