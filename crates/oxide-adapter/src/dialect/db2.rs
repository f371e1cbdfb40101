//! IBM DB2 dialect.

use super::{Dialect, READ_ONLY_KEYWORDS, starts_with_keyword};

/// DB2 dialect.
///
/// DB2 folds unquoted identifiers to upper case, namespaces objects in
/// schemas, lists synonyms, aliases and materialized query tables alongside
/// tables, and accepts stand-alone `VALUES` expressions as queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct Db2Dialect;

impl Db2Dialect {
    /// Creates a new DB2 dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for Db2Dialect {
    fn name(&self) -> &'static str {
        "db2"
    }

    fn table_types(&self) -> &'static [&'static str] {
        &["TABLE", "VIEW", "SYNONYM", "MATERIALIZED QUERY TABLE", "ALIAS"]
    }

    fn supports_schemas(&self) -> bool {
        true
    }

    fn system_schemas(&self) -> &'static [&'static str] {
        &["SYSIBM", "SYSCAT", "SYSSTAT", "SYSFUN", "SYSPROC", "SYSTOOLS"]
    }

    // Upper-case names are DB2's folded form of unquoted identifiers.
    fn case_for_caller(&self, value: &str) -> String {
        if value.chars().any(char::is_lowercase) {
            value.to_string()
        } else {
            value.to_lowercase()
        }
    }

    fn case_for_driver(&self, value: &str) -> String {
        if value.chars().any(char::is_uppercase) {
            value.to_string()
        } else {
            value.to_uppercase()
        }
    }

    fn identity_sql(&self) -> Option<&'static str> {
        Some("VALUES IDENTITY_VAL_LOCAL()")
    }

    fn is_select(&self, sql: &str) -> bool {
        starts_with_keyword(sql, "VALUES")
            || READ_ONLY_KEYWORDS
                .iter()
                .any(|kw| starts_with_keyword(sql, kw))
    }

    // Booleans are emulated with SMALLINT.
    fn quoted_true(&self) -> &'static str {
        "1"
    }

    fn quoted_false(&self) -> &'static str {
        "0"
    }
}
