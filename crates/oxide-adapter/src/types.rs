//! SQL type codes as reported by native drivers.

use serde::Serialize;

/// Abstract SQL type classification reported by a driver for a column or
/// a cell. Codes follow the widely used standard numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    NChar,
    NVarchar,
    LongNVarchar,
    Date,
    Time,
    Timestamp,
    Binary,
    Varbinary,
    LongVarbinary,
    Blob,
    Clob,
    NClob,
    Boolean,
    Null,
    /// A vendor specific code with no standard counterpart.
    Other(i32),
}

impl SqlType {
    /// Returns the numeric type code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Bit => -7,
            Self::TinyInt => -6,
            Self::SmallInt => 5,
            Self::Integer => 4,
            Self::BigInt => -5,
            Self::Float => 6,
            Self::Real => 7,
            Self::Double => 8,
            Self::Numeric => 2,
            Self::Decimal => 3,
            Self::Char => 1,
            Self::Varchar => 12,
            Self::LongVarchar => -1,
            Self::NChar => -15,
            Self::NVarchar => -9,
            Self::LongNVarchar => -16,
            Self::Date => 91,
            Self::Time => 92,
            Self::Timestamp => 93,
            Self::Binary => -2,
            Self::Varbinary => -3,
            Self::LongVarbinary => -4,
            Self::Blob => 2004,
            Self::Clob => 2005,
            Self::NClob => 2011,
            Self::Boolean => 16,
            Self::Null => 0,
            Self::Other(code) => code,
        }
    }

    /// Maps a numeric type code back to a [`SqlType`].
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            -7 => Self::Bit,
            -6 => Self::TinyInt,
            5 => Self::SmallInt,
            4 => Self::Integer,
            -5 => Self::BigInt,
            6 => Self::Float,
            7 => Self::Real,
            8 => Self::Double,
            2 => Self::Numeric,
            3 => Self::Decimal,
            1 => Self::Char,
            12 => Self::Varchar,
            -1 => Self::LongVarchar,
            -15 => Self::NChar,
            -9 => Self::NVarchar,
            -16 => Self::LongNVarchar,
            91 => Self::Date,
            92 => Self::Time,
            93 => Self::Timestamp,
            -2 => Self::Binary,
            -3 => Self::Varbinary,
            -4 => Self::LongVarbinary,
            2004 => Self::Blob,
            2005 => Self::Clob,
            2011 => Self::NClob,
            16 => Self::Boolean,
            0 => Self::Null,
            other => Self::Other(other),
        }
    }

    /// Maps a declared column type, as written in DDL or reported by a
    /// vendor catalog, onto a type code.
    ///
    /// Length and precision suffixes are ignored (`VARCHAR(255)` is
    /// `Varchar`). Unknown names fall back to SQLite-style affinity rules
    /// so that `MEDIUMINT` still lands on `Integer`.
    #[must_use]
    pub fn from_declared_name(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        let base = upper
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_end_matches(" UNSIGNED");

        match base {
            "BIT" => Self::Bit,
            "TINYINT" => Self::TinyInt,
            "SMALLINT" => Self::SmallInt,
            "INT" | "INTEGER" => Self::Integer,
            "BIGINT" => Self::BigInt,
            "FLOAT" => Self::Float,
            "REAL" => Self::Real,
            "DOUBLE" | "DOUBLE PRECISION" => Self::Double,
            "NUMERIC" => Self::Numeric,
            "DECIMAL" | "DEC" | "MONEY" => Self::Decimal,
            "CHAR" | "CHARACTER" => Self::Char,
            "VARCHAR" | "CHARACTER VARYING" | "VARCHAR2" => Self::Varchar,
            "LONG VARCHAR" | "TEXT" => Self::LongVarchar,
            "NCHAR" => Self::NChar,
            "NVARCHAR" => Self::NVarchar,
            "NTEXT" | "LONG NVARCHAR" => Self::LongNVarchar,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" | "DATETIME" | "DATETIME2" | "SMALLDATETIME" => Self::Timestamp,
            "BINARY" => Self::Binary,
            "VARBINARY" => Self::Varbinary,
            "LONG VARBINARY" | "IMAGE" => Self::LongVarbinary,
            "BLOB" => Self::Blob,
            "CLOB" => Self::Clob,
            "NCLOB" => Self::NClob,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "NULL" => Self::Null,
            "" => Self::Null,
            other => Self::from_affinity(other),
        }
    }

    fn from_affinity(name: &str) -> Self {
        if name.contains("INT") {
            Self::Integer
        } else if name.contains("CHAR") || name.contains("CLOB") || name.contains("TEXT") {
            Self::Varchar
        } else if name.contains("BLOB") {
            Self::Blob
        } else if name.contains("REAL") || name.contains("FLOA") || name.contains("DOUB") {
            Self::Double
        } else {
            Self::Numeric
        }
    }
}
