//! Microsoft SQL Server dialect.

use super::{CALL_KEYWORDS, Dialect, starts_with_keyword};
use crate::types::SqlType;

/// Row-number column added by the paging queries this dialect generates.
const ROW_NUM_COLUMN: &str = "_row_num";

/// SQL Server dialect (2000 and later).
#[derive(Debug, Default, Clone, Copy)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Whether the session runs on the jTDS driver rather than Microsoft's.
    ///
    /// jTDS reports `jTDS Type 4 JDBC Driver for MS SQL Server and Sybase`,
    /// Microsoft's driver `Microsoft JDBC Driver 4.0 for SQL Server`.
    #[must_use]
    pub fn is_jtds(driver_name: &str) -> bool {
        driver_name.contains("jTDS")
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn supports_schemas(&self) -> bool {
        true
    }

    fn system_schemas(&self) -> &'static [&'static str] {
        &["sys", "information_schema"]
    }

    fn is_synthetic_column(&self, name: &str) -> bool {
        name == ROW_NUM_COLUMN
    }

    fn reclassify(&self, sql_type: SqlType) -> SqlType {
        match sql_type {
            SqlType::LongVarchar | SqlType::LongNVarchar => SqlType::Clob,
            other => other,
        }
    }

    // Column#primary is relied upon regardless of what the caller asked.
    fn always_mark_primary_keys(&self) -> bool {
        true
    }

    fn identity_sql(&self) -> Option<&'static str> {
        Some("SELECT SCOPE_IDENTITY()")
    }

    fn is_exec(&self, sql: &str) -> bool {
        starts_with_keyword(sql, "EXEC")
            || starts_with_keyword(sql, "EXECUTE")
            || CALL_KEYWORDS.iter().any(|kw| starts_with_keyword(sql, kw))
    }

    fn quote_identifier(&self, name: &str) -> String {
        if name.len() >= 2 && name.starts_with('[') && name.ends_with(']') {
            return name.to_string();
        }
        format!("[{}]", name.replace(']', "]]"))
    }

    fn quoted_true(&self) -> &'static str {
        "1"
    }

    fn quoted_false(&self) -> &'static str {
        "0"
    }

    fn savepoint_sql(&self, name: &str) -> String {
        format!("SAVE TRANSACTION {name}")
    }

    fn rollback_savepoint_sql(&self, name: &str) -> String {
        format!("ROLLBACK TRANSACTION {name}")
    }

    // SQL Server releases savepoints only on commit.
    fn release_savepoint_sql(&self, _name: &str) -> Option<String> {
        None
    }

    // jTDS does not implement releasing savepoints.
    fn native_release_supported(&self, driver_name: &str) -> bool {
        !Self::is_jtds(driver_name)
    }

    fn metadata_hint(&self) -> &'static str {
        "check if this happened during EXPLAIN (SET SHOWPLAN_TEXT ON) and if so \
         turn explain support off for this connection"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::{CoercionPath, path_for};
    use crate::driver::RawCell;
    use crate::value::Value;

    #[test]
    fn test_mssql_dialect() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.name(), "mssql");
        assert!(dialect.supports_schemas());
        assert!(dialect.always_mark_primary_keys());
        assert!(dialect.is_system_schema("SYS"));
        assert!(dialect.is_system_schema("INFORMATION_SCHEMA"));
        assert!(!dialect.is_system_schema("dbo"));
        assert!(dialect.is_synthetic_column("_row_num"));
        assert!(!dialect.is_synthetic_column("row_num"));
    }

    #[test]
    fn test_long_varchar_coerced_as_clob() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.reclassify(SqlType::LongVarchar), SqlType::Clob);
        assert_eq!(dialect.reclassify(SqlType::LongNVarchar), SqlType::Clob);
        assert_eq!(dialect.reclassify(SqlType::Varchar), SqlType::Varchar);
        assert_eq!(
            path_for(dialect.reclassify(SqlType::LongVarchar)),
            CoercionPath::LargeText
        );

        let bytes = "ありがとうございました".as_bytes().to_vec();
        assert_eq!(
            dialect
                .coerce_value(SqlType::LongVarchar, RawCell::Bytes(bytes))
                .unwrap(),
            Value::Text("ありがとうございました".into())
        );
    }

    #[test]
    fn test_exec_predicate() {
        let dialect = MssqlDialect::new();
        assert!(dialect.is_exec("exec sp_helpindex 'users'"));
        assert!(dialect.is_exec("EXECUTE sp_who"));
        assert!(dialect.is_exec("CALL proc()"));
        assert!(!dialect.is_exec("SELECT 1"));
        assert!(!dialect.is_exec("execution_log"));
    }

    #[test]
    fn test_bracket_quoting() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.quote_identifier("users"), "[users]");
        assert_eq!(dialect.quote_identifier("table]name"), "[table]]name]");
        assert_eq!(dialect.quote_identifier("[already]"), "[already]");
        assert_eq!(dialect.quote_table_name("dbo.users"), "[dbo].[users]");
        assert_eq!(dialect.quote_string("O'Reilly"), "'O''Reilly'");
        assert_eq!(dialect.quoted_true(), "1");
        assert_eq!(dialect.quoted_false(), "0");
    }

    #[test]
    fn test_savepoint_sql() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.savepoint_sql("sp1"), "SAVE TRANSACTION sp1");
        assert_eq!(dialect.rollback_savepoint_sql("sp1"), "ROLLBACK TRANSACTION sp1");
        assert_eq!(dialect.release_savepoint_sql("sp1"), None);
    }

    #[test]
    fn test_is_jtds() {
        assert!(MssqlDialect::is_jtds(
            "jTDS Type 4 JDBC Driver for MS SQL Server and Sybase"
        ));
        assert!(!MssqlDialect::is_jtds(
            "Microsoft JDBC Driver 4.0 for SQL Server"
        ));
        let dialect = MssqlDialect::new();
        assert!(!dialect.native_release_supported("jTDS Type 4 JDBC Driver"));
        assert!(dialect.native_release_supported("Microsoft JDBC Driver 4.0 for SQL Server"));
    }
}
