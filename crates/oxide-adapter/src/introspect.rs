//! Schema introspection.
//!
//! Driver metadata scans are turned into descriptor lists here: system
//! schemas are hidden, synthetic columns dropped, identifiers converted to
//! the caller's case, and index scan rows merged into one descriptor per
//! index.

use tracing::{debug, warn};

use crate::connection::{Connection, Session};
use crate::descriptor::{ColumnDescriptor, IndexDescriptor};
use crate::dialect::Dialect;
use crate::driver::{IndexRow, TableFilter};
use crate::error::{AdapterError, Result};

/// Filters of a table listing. `None` means "any".
#[derive(Debug, Clone, Copy, Default)]
pub struct TableQuery<'a> {
    pub catalog: Option<&'a str>,
    pub schema: Option<&'a str>,
    /// `LIKE` pattern on the table name.
    pub name: Option<&'a str>,
    /// Object kinds; the dialect's table types when empty.
    pub types: &'a [&'a str],
}

impl Connection {
    /// Lists table names.
    ///
    /// Tables in the dialect's system schemas are only listed when a schema
    /// filter is given.
    pub fn tables(&mut self, query: TableQuery<'_>) -> Result<Vec<String>> {
        self.execute_scoped(|session| session.tables(query))
    }

    /// Lists the columns of `table`, which may be `schema.name` or
    /// `catalog.schema.name`.
    ///
    /// Primary key membership is computed when `primary_keys` is set or the
    /// dialect always computes it; otherwise every column is reported as
    /// not being part of the key.
    pub fn columns(
        &mut self,
        table: &str,
        schema: Option<&str>,
        primary_keys: bool,
    ) -> Result<Vec<ColumnDescriptor>> {
        self.execute_scoped(|session| session.columns(table, schema, primary_keys))
    }

    /// Lists the secondary indexes of `table`, or only `index` when given.
    pub fn indexes(
        &mut self,
        table: &str,
        schema: Option<&str>,
        index: Option<&str>,
    ) -> Result<Vec<IndexDescriptor>> {
        self.execute_scoped(|session| session.indexes(table, schema, index))
    }
}

impl Session<'_> {
    /// See [`Connection::tables`].
    pub fn tables(&mut self, query: TableQuery<'_>) -> Result<Vec<String>> {
        let dialect = self.dialect;
        let catalog = query.catalog.map(|c| dialect.case_for_driver(c));
        let schema = query.schema.map(|s| dialect.case_for_driver(s));
        let name = query.name.map(|n| dialect.case_for_driver(n));
        let filter = TableFilter {
            catalog: catalog.as_deref(),
            schema_pattern: schema.as_deref(),
            table_pattern: name.as_deref(),
            types: if query.types.is_empty() {
                dialect.table_types()
            } else {
                query.types
            },
        };
        let rows = self.driver.tables(&filter)?;
        debug!(rows = rows.len(), "table metadata scanned");

        let mut names = Vec::with_capacity(rows.len());
        for row in rows {
            if query.schema.is_none()
                && row
                    .schema
                    .as_deref()
                    .is_some_and(|s| dialect.is_system_schema(s))
            {
                continue;
            }
            let Some(table) = row.name else {
                return Err(AdapterError::AmbiguousMetadata {
                    catalog: catalog.clone(),
                    schema: schema.clone(),
                    table: name.clone(),
                    hint: dialect.metadata_hint().to_string(),
                });
            };
            names.push(dialect.normalize_table_name(&table));
        }
        Ok(names)
    }

    /// See [`Connection::columns`].
    pub fn columns(
        &mut self,
        table: &str,
        schema: Option<&str>,
        primary_keys: bool,
    ) -> Result<Vec<ColumnDescriptor>> {
        let dialect = self.dialect;
        let qualified = dialect.extract_table_name(table, schema)?;
        let rows = self.driver.columns(&qualified)?;
        let keys = if primary_keys || dialect.always_mark_primary_keys() {
            self.driver.primary_keys(&qualified)?
        } else {
            Vec::new()
        };
        Ok(rows
            .into_iter()
            .filter(|row| !dialect.is_synthetic_column(&row.name))
            .map(|row| ColumnDescriptor {
                primary_key: keys.contains(&row.name),
                name: dialect.case_for_caller(&row.name),
                sql_type: row.sql_type,
                type_name: row.type_name,
                precision: row.precision,
                scale: row.scale,
                nullable: row.nullable,
                default: row.default,
            })
            .collect())
    }

    /// See [`Connection::indexes`].
    pub fn indexes(
        &mut self,
        table: &str,
        schema: Option<&str>,
        index: Option<&str>,
    ) -> Result<Vec<IndexDescriptor>> {
        let dialect = self.dialect;
        let qualified = dialect.extract_table_name(table, schema)?;
        let rows = match self.driver.index_info(&qualified) {
            Ok(rows) => rows,
            Err(failure) if dialect.is_benign_index_failure(&failure) => {
                warn!(table = %qualified, error = %failure, "index scan failed, assuming no indexes");
                return Ok(Vec::new());
            }
            Err(failure) => return Err(failure.into()),
        };
        let keys = self.driver.primary_keys(&qualified)?;
        let fallback_table = dialect.case_for_caller(&qualified.name);
        Ok(merge_index_rows(dialect, rows, &keys, index, &fallback_table))
    }
}

/// Merges consecutive rows of the same index, skipping primary key columns
/// and rows without an index name.
fn merge_index_rows(
    dialect: &dyn Dialect,
    rows: Vec<IndexRow>,
    primary_keys: &[String],
    only: Option<&str>,
    fallback_table: &str,
) -> Vec<IndexDescriptor> {
    let mut indexes: Vec<IndexDescriptor> = Vec::new();
    for row in rows {
        let (Some(index_name), Some(column)) = (row.index_name, row.column_name) else {
            continue;
        };
        if primary_keys.contains(&column) {
            continue;
        }
        let index_name = dialect.case_for_caller(&index_name);
        if only.is_some_and(|wanted| wanted != index_name) {
            continue;
        }
        let column = dialect.case_for_caller(&column);
        match indexes.last_mut() {
            Some(last) if last.index_name == index_name => last.columns.push(column),
            _ => indexes.push(IndexDescriptor {
                table_name: row
                    .table_name
                    .map_or_else(|| fallback_table.to_string(), |t| dialect.case_for_caller(&t)),
                index_name,
                unique: !row.non_unique,
                columns: vec![column],
            }),
        }
    }
    indexes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Db2Dialect, GenericDialect};

    fn row(index: Option<&str>, column: &str, non_unique: bool) -> IndexRow {
        IndexRow {
            table_name: Some("users".into()),
            index_name: index.map(str::to_string),
            non_unique,
            column_name: Some(column.into()),
        }
    }

    #[test]
    fn test_merge_consecutive_rows() {
        let rows = vec![
            row(Some("idx_a"), "x", true),
            row(Some("idx_a"), "y", true),
            row(Some("idx_b"), "z", false),
        ];
        let indexes = merge_index_rows(&GenericDialect::new(), rows, &[], None, "users");
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].index_name, "idx_a");
        assert!(!indexes[0].unique);
        assert_eq!(indexes[0].columns, vec!["x", "y"]);
        assert_eq!(indexes[1].index_name, "idx_b");
        assert!(indexes[1].unique);
        assert_eq!(indexes[1].columns, vec!["z"]);
    }

    #[test]
    fn test_primary_key_columns_and_null_names_skipped() {
        let rows = vec![
            row(Some("pk_users"), "id", false),
            row(Some("idx_a"), "id", true),
            row(Some("idx_a"), "x", true),
            row(None, "y", true),
        ];
        let keys = vec!["id".to_string()];
        let indexes = merge_index_rows(&GenericDialect::new(), rows, &keys, None, "users");
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].columns, vec!["x"]);
    }

    #[test]
    fn test_index_filter_and_case() {
        let rows = vec![
            IndexRow {
                table_name: None,
                index_name: Some("IDX_A".into()),
                non_unique: true,
                column_name: Some("X".into()),
            },
            IndexRow {
                table_name: None,
                index_name: Some("IDX_B".into()),
                non_unique: true,
                column_name: Some("Y".into()),
            },
        ];
        let indexes = merge_index_rows(&Db2Dialect::new(), rows, &[], Some("idx_b"), "users");
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].table_name, "users");
        assert_eq!(indexes[0].columns, vec!["y"]);
    }
}
