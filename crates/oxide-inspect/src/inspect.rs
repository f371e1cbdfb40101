//! Subcommands and their JSON output.

use std::fs;
use std::path::Path;

use anyhow::Context;
use clap::Subcommand;
use serde_json::{json, Value as Json};

use oxide_adapter::prelude::*;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List tables.
    Tables {
        /// Schema to list (system schemas are hidden without one).
        #[arg(short, long)]
        schema: Option<String>,

        /// `LIKE` pattern on table names.
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List the columns of a table.
    Columns {
        /// Table name, optionally `schema.table`.
        table: String,
    },

    /// List the secondary indexes of a table.
    Indexes {
        /// Table name, optionally `schema.table`.
        table: String,

        /// Only this index.
        #[arg(short, long)]
        index: Option<String>,
    },

    /// Run one SQL statement.
    Query {
        /// The statement.
        sql: String,
    },

    /// Show the identity value generated last in the session.
    LastInsertId,
}

/// Reads adapter options from `path`, if any; `adapter` overrides the
/// configured dialect.
pub fn load_config(path: Option<&Path>, adapter: Option<String>) -> anyhow::Result<AdapterConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            AdapterConfig::from_json(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => AdapterConfig::new(),
    };
    if adapter.is_some() {
        config.adapter = adapter;
    }
    Ok(config)
}

/// Runs one subcommand and returns what it found.
pub fn run(conn: &mut Connection, command: &Commands) -> anyhow::Result<Json> {
    let output = match command {
        Commands::Tables { schema, name } => json!(conn.tables(TableQuery {
            schema: schema.as_deref(),
            name: name.as_deref(),
            ..TableQuery::default()
        })?),
        Commands::Columns { table } => json!(conn.columns(table, None, true)?),
        Commands::Indexes { table, index } => json!(conn.indexes(table, None, index.as_deref())?),
        Commands::Query { sql } if conn.is_select(sql) => json!(conn.execute_query(sql)?),
        Commands::Query { sql } => json!({ "updated": conn.execute_update(sql)? }),
        Commands::LastInsertId => json!(conn.last_insert_id()?),
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_adapter::memory::{MemoryDriver, MemoryResult};

    fn connect(driver: MemoryDriver) -> Connection {
        Connection::new(driver, AdapterConfig::new()).unwrap()
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.json");
        fs::write(&path, r#"{"adapter": "mssql", "pool": 5}"#).unwrap();

        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.adapter.as_deref(), Some("mssql"));

        let config = load_config(Some(&path), Some("db2".into())).unwrap();
        assert_eq!(config.adapter.as_deref(), Some("db2"));
    }

    #[test]
    fn test_load_config_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.json");
        fs::write(&path, r#"{"savepoints": "often"}"#).unwrap();
        assert!(load_config(Some(&path), None).is_err());
        assert!(load_config(Some(&dir.path().join("missing.json")), None).is_err());
    }

    #[test]
    fn test_tables_as_json() {
        let driver = MemoryDriver::new("SQLite JDBC").with_table(TableRow {
            name: Some("Users".into()),
            kind: Some("TABLE".into()),
            ..TableRow::default()
        });
        let mut conn = connect(driver);
        let output = run(
            &mut conn,
            &Commands::Tables {
                schema: None,
                name: None,
            },
        )
        .unwrap();
        assert_eq!(output, json!(["users"]));
    }

    #[test]
    fn test_query_routes_on_statement_kind() {
        let driver = MemoryDriver::new("SQLite JDBC")
            .with_result(
                "SELECT 1 AS one",
                MemoryResult::new(vec![ColumnMeta::new("one", SqlType::Integer)])
                    .row(vec![Cell::new(SqlType::Integer, RawCell::Integer(1))]),
            )
            .with_update_count("DELETE FROM users", 3);
        let mut conn = connect(driver);

        let output = run(
            &mut conn,
            &Commands::Query {
                sql: "SELECT 1 AS one".into(),
            },
        )
        .unwrap();
        assert_eq!(output["rows"], json!([[1]]));
        assert_eq!(output["columns"][0]["name"], json!("one"));

        let output = run(
            &mut conn,
            &Commands::Query {
                sql: "DELETE FROM users".into(),
            },
        )
        .unwrap();
        assert_eq!(output, json!({ "updated": 3 }));
    }
}
