//! The sqlx-backed SQLite session.

use std::collections::VecDeque;

use oxide_adapter::descriptor::QualifiedTableName;
use oxide_adapter::driver::{
    Capability, Cell, ColumnMeta, ColumnRow, Cursor, Driver, DriverResult, IndexRow, RawCell,
    Statement, TableFilter, TableRow,
};
use oxide_adapter::types::SqlType;
use sqlx::sqlite::{SqliteConnection, SqliteQueryResult, SqliteRow};
use sqlx::{Column, Connection, Executor, Row, Statement as _, TypeInfo, ValueRef};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::error::{closed, failure, Result};

/// Name this driver reports; the dialect registry detects SQLite from it.
pub const DRIVER_NAME: &str = "SQLite (sqlx)";

/// One SQLite session.
///
/// sqlx is asynchronous; every call blocks on a private current-thread
/// runtime, so the session must not be used from inside another runtime.
pub struct SqliteDriver {
    runtime: Runtime,
    conn: Option<SqliteConnection>,
    auto_commit: bool,
}

impl std::fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("open", &self.conn.is_some())
            .field("auto_commit", &self.auto_commit)
            .finish_non_exhaustive()
    }
}

impl SqliteDriver {
    /// Opens a session, e.g. `sqlite::memory:` or `sqlite://app.db?mode=rwc`.
    pub fn connect(url: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let conn = runtime.block_on(SqliteConnection::connect(url))?;
        info!(url, "opened SQLite session");
        Ok(Self {
            runtime,
            conn: Some(conn),
            auto_commit: true,
        })
    }

    /// Opens a private in-memory database.
    pub fn memory() -> Result<Self> {
        Self::connect("sqlite::memory:")
    }

    /// Closes the session. Later calls fail.
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            self.runtime.block_on(conn.close())?;
        }
        Ok(())
    }

    fn conn(&mut self) -> DriverResult<&mut SqliteConnection> {
        self.conn.as_mut().ok_or_else(closed)
    }

    fn execute(&mut self, sql: &str) -> DriverResult<SqliteQueryResult> {
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        self.runtime
            .block_on(sqlx::query(sql).execute(conn))
            .map_err(failure)
    }

    fn fetch(&mut self, sql: &str) -> DriverResult<(Vec<ColumnMeta>, Vec<SqliteRow>)> {
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        let statement = self
            .runtime
            .block_on((&mut *conn).prepare(sql))
            .map_err(failure)?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| ColumnMeta::new(c.name(), SqlType::from_declared_name(c.type_info().name())))
            .collect();
        let rows = self
            .runtime
            .block_on(sqlx::query(sql).fetch_all(&mut *conn))
            .map_err(failure)?;
        Ok((columns, rows))
    }

    fn table_info(&mut self, table: &QualifiedTableName) -> DriverResult<Vec<ColumnInfo>> {
        let sql = format!("PRAGMA {}", pragma_target("table_info", &table.name));
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        let rows: Vec<(i64, String, String, i64, Option<String>, i64)> = self
            .runtime
            .block_on(sqlx::query_as(&sql).fetch_all(conn))
            .map_err(failure)?;
        Ok(rows
            .into_iter()
            .map(|(_, name, declared, not_null, default, pk)| ColumnInfo {
                name,
                declared,
                not_null: not_null != 0,
                default,
                pk,
            })
            .collect())
    }
}

struct ColumnInfo {
    name: String,
    declared: String,
    not_null: bool,
    default: Option<String>,
    /// Position in the primary key, 0 when not part of it.
    pk: i64,
}

/// Quotes an identifier for use in a PRAGMA.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Builds `schema.pragma("table")` from a possibly `schema.table` name;
/// the SQLite dialect folds schemas into table names.
fn pragma_target(pragma: &str, table: &str) -> String {
    match table.split_once('.') {
        Some((schema, name)) => format!("{}.{pragma}({})", quote(schema), quote(name)),
        None => format!("{pragma}({})", quote(table)),
    }
}

/// Splits `VARCHAR(255)` / `DECIMAL(10,2)` into precision and scale.
fn type_params(declared: &str) -> (Option<u32>, Option<u32>) {
    let Some(params) = declared
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(params, _)| params)
    else {
        return (None, None);
    };
    let mut parts = params.split(',').map(|p| p.trim().parse::<u32>().ok());
    (parts.next().flatten(), parts.next().flatten())
}

fn storage_type(name: &str) -> SqlType {
    match name {
        "INTEGER" => SqlType::BigInt,
        "REAL" => SqlType::Double,
        "BLOB" => SqlType::Blob,
        "NULL" => SqlType::Null,
        _ => SqlType::Varchar,
    }
}

/// Reads one row into cells, reporting each value's storage class rather
/// than the column's declared type.
fn read_cells(row: &SqliteRow) -> DriverResult<Vec<Cell>> {
    (0..row.len())
        .map(|i| {
            let value = row.try_get_raw(i).map_err(failure)?;
            if value.is_null() {
                return Ok(Cell::null(SqlType::Null));
            }
            let reported = storage_type(value.type_info().name());
            let raw = match reported {
                SqlType::BigInt => RawCell::Integer(row.try_get_unchecked(i).map_err(failure)?),
                SqlType::Double => RawCell::Real(row.try_get_unchecked(i).map_err(failure)?),
                SqlType::Blob => RawCell::Bytes(row.try_get_unchecked(i).map_err(failure)?),
                _ => RawCell::Text(row.try_get_unchecked(i).map_err(failure)?),
            };
            Ok(Cell::new(reported, raw))
        })
        .collect()
}

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn create_statement(&mut self) -> DriverResult<Box<dyn Statement + '_>> {
        self.conn()?;
        Ok(Box::new(SqliteStatement {
            driver: self,
            last_insert_rowid: None,
            closed: false,
        }))
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    // SQLite commits every statement unless a transaction is open.
    fn set_auto_commit(&mut self, enabled: bool) -> DriverResult<()> {
        if enabled == self.auto_commit {
            return Ok(());
        }
        self.execute(if enabled { "COMMIT" } else { "BEGIN" })?;
        self.auto_commit = enabled;
        Ok(())
    }

    fn supports_generated_keys(&self) -> bool {
        true
    }

    fn probe(&self, capability: Capability) -> bool {
        match capability {
            Capability::NativeSavepoints => false,
        }
    }

    fn tables(&mut self, filter: &TableFilter<'_>) -> DriverResult<Vec<TableRow>> {
        let schema = filter.schema_pattern.unwrap_or("main");
        let sql = format!(
            "SELECT name, type FROM {}.sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' AND name LIKE ? \
             ORDER BY name",
            quote(schema)
        );
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        let rows: Vec<(String, String)> = self
            .runtime
            .block_on(
                sqlx::query_as(&sql)
                    .bind(filter.table_pattern.unwrap_or("%"))
                    .fetch_all(conn),
            )
            .map_err(failure)?;
        Ok(rows
            .into_iter()
            .map(|(name, kind)| TableRow {
                catalog: None,
                schema: Some(schema.to_string()),
                name: Some(name),
                kind: Some(kind.to_ascii_uppercase()),
            })
            .filter(|row| {
                filter.types.is_empty()
                    || row
                        .kind
                        .as_deref()
                        .is_some_and(|k| filter.types.iter().any(|t| t.eq_ignore_ascii_case(k)))
            })
            .collect())
    }

    fn columns(&mut self, table: &QualifiedTableName) -> DriverResult<Vec<ColumnRow>> {
        Ok(self
            .table_info(table)?
            .into_iter()
            .map(|info| {
                let (precision, scale) = type_params(&info.declared);
                ColumnRow {
                    sql_type: SqlType::from_declared_name(&info.declared),
                    name: info.name,
                    type_name: info.declared,
                    precision,
                    scale,
                    nullable: !info.not_null,
                    default: info.default,
                }
            })
            .collect())
    }

    fn primary_keys(&mut self, table: &QualifiedTableName) -> DriverResult<Vec<String>> {
        let mut keys: Vec<ColumnInfo> = self
            .table_info(table)?
            .into_iter()
            .filter(|info| info.pk > 0)
            .collect();
        keys.sort_by_key(|info| info.pk);
        Ok(keys.into_iter().map(|info| info.name).collect())
    }

    fn index_info(&mut self, table: &QualifiedTableName) -> DriverResult<Vec<IndexRow>> {
        let list_sql = format!("PRAGMA {}", pragma_target("index_list", &table.name));
        let conn = self.conn.as_mut().ok_or_else(closed)?;
        let indexes = self
            .runtime
            .block_on(sqlx::query(&list_sql).fetch_all(&mut *conn))
            .map_err(failure)?;
        let mut indexes: Vec<(String, bool)> = indexes
            .iter()
            .map(|row| -> std::result::Result<_, sqlx::Error> {
                Ok((row.try_get("name")?, row.try_get::<i64, _>("unique")? != 0))
            })
            .collect::<std::result::Result<_, _>>()
            .map_err(failure)?;
        indexes.sort();

        let schema_prefix = table
            .name
            .split_once('.')
            .map(|(schema, _)| format!("{schema}."))
            .unwrap_or_default();
        let table_name = table
            .name
            .split_once('.')
            .map_or(table.name.as_str(), |(_, name)| name);
        let mut rows = Vec::new();
        for (index, unique) in indexes {
            let info_sql = format!(
                "PRAGMA {}",
                pragma_target("index_info", &format!("{schema_prefix}{index}"))
            );
            let columns: Vec<(i64, i64, Option<String>)> = self
                .runtime
                .block_on(sqlx::query_as(&info_sql).fetch_all(&mut *conn))
                .map_err(failure)?;
            rows.extend(columns.into_iter().map(|(_, _, column)| IndexRow {
                table_name: Some(table_name.to_string()),
                index_name: Some(index.clone()),
                non_unique: !unique,
                column_name: column,
            }));
        }
        debug!(table = %table, rows = rows.len(), "index metadata scanned");
        Ok(rows)
    }
}

struct SqliteStatement<'a> {
    driver: &'a mut SqliteDriver,
    last_insert_rowid: Option<i64>,
    closed: bool,
}

impl SqliteStatement<'_> {
    fn check_open(&self) -> DriverResult<()> {
        if self.closed {
            return Err(closed());
        }
        Ok(())
    }
}

impl Statement for SqliteStatement<'_> {
    // SQLite has no escape syntax to process.
    fn set_escape_processing(&mut self, _enabled: bool) -> DriverResult<()> {
        Ok(())
    }

    fn execute_update(&mut self, sql: &str) -> DriverResult<u64> {
        self.check_open()?;
        let result = self.driver.execute(sql)?;
        self.last_insert_rowid = Some(result.last_insert_rowid());
        Ok(result.rows_affected())
    }

    fn execute_query(&mut self, sql: &str) -> DriverResult<Box<dyn Cursor + '_>> {
        self.check_open()?;
        let (columns, rows) = self.driver.fetch(sql)?;
        let rows = rows.iter().map(read_cells).collect::<DriverResult<_>>()?;
        Ok(Box::new(SqliteCursor {
            columns,
            rows,
            closed: false,
        }))
    }

    fn generated_keys(&mut self) -> DriverResult<Box<dyn Cursor + '_>> {
        self.check_open()?;
        let rows = self
            .last_insert_rowid
            .map(|id| vec![Cell::new(SqlType::BigInt, RawCell::Integer(id))])
            .into_iter()
            .collect();
        Ok(Box::new(SqliteCursor {
            columns: vec![ColumnMeta::new("last_insert_rowid()", SqlType::BigInt)],
            rows,
            closed: false,
        }))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

struct SqliteCursor {
    columns: Vec<ColumnMeta>,
    rows: VecDeque<Vec<Cell>>,
    closed: bool,
}

impl Cursor for SqliteCursor {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn next_row(&mut self) -> DriverResult<Option<Vec<Cell>>> {
        if self.closed {
            return Err(closed());
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        self.closed = true;
        self.rows.clear();
    }
}
