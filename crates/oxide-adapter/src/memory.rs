//! A scripted in-memory [`Driver`].
//!
//! `MemoryDriver` answers metadata scans and queries from data registered up
//! front and records everything done to it in a [`Journal`] that outlives
//! the driver, so tests can inspect a session after handing the driver to a
//! [`crate::Connection`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::descriptor::QualifiedTableName;
use crate::driver::{
    Capability, Cell, ColumnMeta, ColumnRow, Cursor, Driver, DriverFailure, DriverResult,
    IndexRow, NativeSavepoint, Statement, TableFilter, TableRow,
};

/// Where an injected failure fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Executing exactly this SQL text.
    Sql(String),
    Tables,
    Columns,
    PrimaryKeys,
    IndexInfo,
    GeneratedKeys,
    AutoCommit,
}

/// A canned result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Cell>>,
}

impl MemoryResult {
    /// Creates an empty result with the given columns.
    #[must_use]
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    #[must_use]
    pub fn row(mut self, cells: Vec<Cell>) -> Self {
        self.rows.push(cells);
        self
    }
}

/// Everything observed by a [`MemoryDriver`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalState {
    /// SQL text passed to `execute_update` / `execute_query`, in order.
    pub executed: Vec<String>,
    /// Native savepoint calls, e.g. `set sp1`, `rollback sp1`.
    pub native_calls: Vec<String>,
    pub statements_opened: usize,
    pub statements_open: usize,
    pub cursors_opened: usize,
    pub cursors_open: usize,
    pub probes: usize,
    pub escape_processing: Option<bool>,
}

/// Shared handle on a [`MemoryDriver`]'s observations.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<JournalState>>);

impl Journal {
    fn lock(&self) -> MutexGuard<'_, JournalState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current observations.
    #[must_use]
    pub fn snapshot(&self) -> JournalState {
        self.lock().clone()
    }

    /// SQL executed so far.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Native savepoint calls made so far.
    #[must_use]
    pub fn native_calls(&self) -> Vec<String> {
        self.lock().native_calls.clone()
    }

    /// Statements and cursors currently open.
    #[must_use]
    pub fn open_resources(&self) -> usize {
        let state = self.lock();
        state.statements_open + state.cursors_open
    }
}

/// A scripted, in-memory database session.
#[derive(Debug)]
pub struct MemoryDriver {
    name: String,
    closed: bool,
    auto_commit: bool,
    native_savepoints: bool,
    next_savepoint_id: u64,
    tables: Vec<TableRow>,
    columns: HashMap<String, Vec<ColumnRow>>,
    primary_keys: HashMap<String, Vec<String>>,
    indexes: HashMap<String, Vec<IndexRow>>,
    results: HashMap<String, MemoryResult>,
    update_counts: HashMap<String, u64>,
    generated_keys: Option<MemoryResult>,
    failures: HashMap<FailPoint, DriverFailure>,
    journal: Journal,
}

impl MemoryDriver {
    /// Creates an empty session reporting `name` as its driver name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            closed: false,
            auto_commit: true,
            native_savepoints: false,
            next_savepoint_id: 1,
            tables: Vec::new(),
            columns: HashMap::new(),
            primary_keys: HashMap::new(),
            indexes: HashMap::new(),
            results: HashMap::new(),
            update_counts: HashMap::new(),
            generated_keys: None,
            failures: HashMap::new(),
            journal: Journal::default(),
        }
    }

    /// Makes the native savepoint API available (or not).
    #[must_use]
    pub const fn with_native_savepoints(mut self, available: bool) -> Self {
        self.native_savepoints = available;
        self
    }

    /// Marks the session closed.
    #[must_use]
    pub const fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    /// Adds a row to the table metadata scan.
    #[must_use]
    pub fn with_table(mut self, row: TableRow) -> Self {
        self.tables.push(row);
        self
    }

    /// Registers the column rows of `table`.
    #[must_use]
    pub fn with_columns(mut self, table: &str, columns: Vec<ColumnRow>) -> Self {
        self.columns.insert(table.to_string(), columns);
        self
    }

    /// Registers the primary key of `table`.
    #[must_use]
    pub fn with_primary_key(mut self, table: &str, columns: &[&str]) -> Self {
        self.primary_keys.insert(
            table.to_string(),
            columns.iter().map(|c| (*c).to_string()).collect(),
        );
        self
    }

    /// Registers the index scan rows of `table`, in scan order.
    #[must_use]
    pub fn with_index_rows(mut self, table: &str, rows: Vec<IndexRow>) -> Self {
        self.indexes.insert(table.to_string(), rows);
        self
    }

    /// Registers the result of a query.
    #[must_use]
    pub fn with_result(mut self, sql: &str, result: MemoryResult) -> Self {
        self.results.insert(sql.to_string(), result);
        self
    }

    /// Registers the update count of a statement.
    #[must_use]
    pub fn with_update_count(mut self, sql: &str, count: u64) -> Self {
        self.update_counts.insert(sql.to_string(), count);
        self
    }

    /// Makes the driver claim generated key support and return `keys`
    /// after every update.
    #[must_use]
    pub fn with_generated_keys(mut self, keys: MemoryResult) -> Self {
        self.generated_keys = Some(keys);
        self
    }

    /// Injects a failure.
    #[must_use]
    pub fn with_failure(mut self, point: FailPoint, failure: DriverFailure) -> Self {
        self.failures.insert(point, failure);
        self
    }

    /// Handle on this driver's observations.
    #[must_use]
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Number of capability probes answered.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.journal.lock().probes
    }

    fn check(&self, point: &FailPoint) -> DriverResult<()> {
        self.failures.get(point).map_or(Ok(()), |f| Err(f.clone()))
    }

    fn check_sql(&self, sql: &str) -> DriverResult<()> {
        self.check(&FailPoint::Sql(sql.to_string()))
    }

    fn check_open(&self) -> DriverResult<()> {
        if self.closed {
            return Err(DriverFailure::new("connection is closed"));
        }
        Ok(())
    }

    fn native_call(&self, call: &str) -> DriverResult<()> {
        if self.native_savepoints {
            self.journal.lock().native_calls.push(call.to_string());
            Ok(())
        } else {
            Err(DriverFailure::unsupported("savepoints"))
        }
    }
}

impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn create_statement(&mut self) -> DriverResult<Box<dyn Statement + '_>> {
        self.check_open()?;
        {
            let mut journal = self.journal.lock();
            journal.statements_opened += 1;
            journal.statements_open += 1;
        }
        Ok(Box::new(MemoryStatement {
            driver: self,
            closed: false,
            updated: false,
        }))
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn set_auto_commit(&mut self, enabled: bool) -> DriverResult<()> {
        self.check(&FailPoint::AutoCommit)?;
        self.auto_commit = enabled;
        Ok(())
    }

    fn supports_generated_keys(&self) -> bool {
        self.generated_keys.is_some()
    }

    fn probe(&self, capability: Capability) -> bool {
        self.journal.lock().probes += 1;
        match capability {
            Capability::NativeSavepoints => self.native_savepoints,
        }
    }

    fn set_savepoint(&mut self, name: &str) -> DriverResult<NativeSavepoint> {
        self.native_call(&format!("set {name}"))?;
        let id = self.next_savepoint_id;
        self.next_savepoint_id += 1;
        Ok(NativeSavepoint {
            id,
            name: Some(name.to_string()),
        })
    }

    fn rollback_to_savepoint(&mut self, savepoint: &NativeSavepoint) -> DriverResult<()> {
        let name = savepoint.name.as_deref().unwrap_or_default();
        self.native_call(&format!("rollback {name}"))
    }

    fn release_savepoint(&mut self, savepoint: &NativeSavepoint) -> DriverResult<()> {
        let name = savepoint.name.as_deref().unwrap_or_default();
        self.native_call(&format!("release {name}"))
    }

    fn tables(&mut self, filter: &TableFilter<'_>) -> DriverResult<Vec<TableRow>> {
        self.check(&FailPoint::Tables)?;
        Ok(self
            .tables
            .iter()
            .filter(|row| table_matches(row, filter))
            .cloned()
            .collect())
    }

    fn columns(&mut self, table: &QualifiedTableName) -> DriverResult<Vec<ColumnRow>> {
        self.check(&FailPoint::Columns)?;
        Ok(self.columns.get(&table.name).cloned().unwrap_or_default())
    }

    fn primary_keys(&mut self, table: &QualifiedTableName) -> DriverResult<Vec<String>> {
        self.check(&FailPoint::PrimaryKeys)?;
        Ok(self
            .primary_keys
            .get(&table.name)
            .cloned()
            .unwrap_or_default())
    }

    fn index_info(&mut self, table: &QualifiedTableName) -> DriverResult<Vec<IndexRow>> {
        self.check(&FailPoint::IndexInfo)?;
        Ok(self.indexes.get(&table.name).cloned().unwrap_or_default())
    }
}

fn table_matches(row: &TableRow, filter: &TableFilter<'_>) -> bool {
    let matches = |pattern: Option<&str>, value: Option<&str>, exact: bool| match (pattern, value)
    {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(p), Some(v)) if exact => p == v,
        (Some(p), Some(v)) => like(p, v),
    };
    // a row without a name still matches: the scan reports it as is
    let name_ok = row.name.is_none() || matches(filter.table_pattern, row.name.as_deref(), false);
    let kind_ok = filter.types.is_empty()
        || row
            .kind
            .as_deref()
            .is_none_or(|k| filter.types.iter().any(|t| t.eq_ignore_ascii_case(k)));
    // rows of catalog-less databases match any catalog filter
    let catalog_ok = row.catalog.is_none() || matches(filter.catalog, row.catalog.as_deref(), true);
    catalog_ok
        && matches(filter.schema_pattern, row.schema.as_deref(), false)
        && name_ok
        && kind_ok
}

/// SQL `LIKE` matching with `%` and `_`, case-sensitive.
fn like(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();
    // matched[j]: pattern prefix so far matches value[..j]
    let mut matched = vec![false; value.len() + 1];
    matched[0] = true;
    for p in pattern {
        matched = if p == '%' {
            let mut any = false;
            matched
                .iter()
                .map(|&m| {
                    any |= m;
                    any
                })
                .collect()
        } else {
            std::iter::once(false)
                .chain(
                    value
                        .iter()
                        .zip(&matched)
                        .map(|(&v, &m)| m && (p == '_' || p == v)),
                )
                .collect()
        };
    }
    matched[value.len()]
}

struct MemoryStatement<'a> {
    driver: &'a MemoryDriver,
    closed: bool,
    updated: bool,
}

impl MemoryStatement<'_> {
    fn record(&self, sql: &str) -> DriverResult<()> {
        if self.closed {
            return Err(DriverFailure::new("statement is closed"));
        }
        self.driver.journal.lock().executed.push(sql.to_string());
        self.driver.check_sql(sql)
    }

    fn open_cursor(&self, result: MemoryResult) -> Box<dyn Cursor> {
        {
            let mut journal = self.driver.journal.lock();
            journal.cursors_opened += 1;
            journal.cursors_open += 1;
        }
        Box::new(MemoryCursor {
            columns: result.columns,
            rows: result.rows.into(),
            journal: self.driver.journal.clone(),
            closed: false,
        })
    }
}

impl Statement for MemoryStatement<'_> {
    fn set_escape_processing(&mut self, enabled: bool) -> DriverResult<()> {
        self.driver.journal.lock().escape_processing = Some(enabled);
        Ok(())
    }

    fn execute_update(&mut self, sql: &str) -> DriverResult<u64> {
        self.record(sql)?;
        self.updated = true;
        Ok(self.driver.update_counts.get(sql).copied().unwrap_or(0))
    }

    fn execute_query(&mut self, sql: &str) -> DriverResult<Box<dyn Cursor + '_>> {
        self.record(sql)?;
        let result = self
            .driver
            .results
            .get(sql)
            .cloned()
            .ok_or_else(|| DriverFailure::new(format!("no result registered for: {sql}")))?;
        Ok(self.open_cursor(result))
    }

    fn generated_keys(&mut self) -> DriverResult<Box<dyn Cursor + '_>> {
        self.driver.check(&FailPoint::GeneratedKeys)?;
        match (&self.driver.generated_keys, self.updated) {
            (Some(keys), true) => Ok(self.open_cursor(keys.clone())),
            (Some(_), false) => Err(DriverFailure::new("no update executed")),
            (None, _) => Err(DriverFailure::unsupported("generated keys")),
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.driver.journal.lock().statements_open -= 1;
        }
    }
}

struct MemoryCursor {
    columns: Vec<ColumnMeta>,
    rows: VecDeque<Vec<Cell>>,
    journal: Journal,
    closed: bool,
}

impl Cursor for MemoryCursor {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn next_row(&mut self) -> DriverResult<Option<Vec<Cell>>> {
        if self.closed {
            return Err(DriverFailure::new("cursor is closed"));
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.journal.lock().cursors_open -= 1;
        }
    }
}
