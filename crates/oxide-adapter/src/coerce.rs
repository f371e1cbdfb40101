//! Type coercion: driver cells into host [`Value`]s.
//!
//! The base mapping is keyed on the declared type code only. Dialects may
//! re-resolve the type before it gets here, or reclassify one code as
//! another; see [`crate::dialect::Dialect::coerce_value`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::driver::RawCell;
use crate::error::{AdapterError, Result};
use crate::types::SqlType;
use crate::value::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// The route a declared type takes through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionPath {
    Integer,
    Boolean,
    Float,
    Decimal,
    Text,
    LargeText,
    Binary,
    LargeBinary,
    Date,
    Time,
    Timestamp,
    /// No dedicated mapping: the cell's own shape decides.
    Fallback,
}

/// Returns the path the base mapping uses for a declared type.
#[must_use]
pub const fn path_for(sql_type: SqlType) -> CoercionPath {
    match sql_type {
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt => {
            CoercionPath::Integer
        }
        SqlType::Bit | SqlType::Boolean => CoercionPath::Boolean,
        SqlType::Float | SqlType::Real | SqlType::Double => CoercionPath::Float,
        SqlType::Numeric | SqlType::Decimal => CoercionPath::Decimal,
        SqlType::Char
        | SqlType::Varchar
        | SqlType::LongVarchar
        | SqlType::NChar
        | SqlType::NVarchar
        | SqlType::LongNVarchar => CoercionPath::Text,
        SqlType::Clob | SqlType::NClob => CoercionPath::LargeText,
        SqlType::Binary | SqlType::Varbinary => CoercionPath::Binary,
        SqlType::LongVarbinary | SqlType::Blob => CoercionPath::LargeBinary,
        SqlType::Date => CoercionPath::Date,
        SqlType::Time => CoercionPath::Time,
        SqlType::Timestamp => CoercionPath::Timestamp,
        SqlType::Null | SqlType::Other(_) => CoercionPath::Fallback,
    }
}

/// Coerces one raw cell using the base mapping for `sql_type`.
///
/// A `NULL` cell always yields [`Value::Absent`].
pub fn coerce(sql_type: SqlType, raw: RawCell) -> Result<Value> {
    if raw == RawCell::Null {
        return Ok(Value::Absent);
    }
    match path_for(sql_type) {
        CoercionPath::Integer => to_integer(sql_type, raw),
        CoercionPath::Boolean => to_boolean(sql_type, raw),
        CoercionPath::Float => to_float(sql_type, raw),
        CoercionPath::Decimal => to_decimal(sql_type, raw),
        CoercionPath::Text => to_text(sql_type, raw),
        CoercionPath::LargeText => to_large_text(sql_type, raw),
        CoercionPath::Binary | CoercionPath::LargeBinary => Ok(to_binary(raw)),
        CoercionPath::Date => to_temporal(sql_type, raw, |s| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .map(Value::Date)
        }),
        CoercionPath::Time => to_temporal(sql_type, raw, |s| {
            TIME_FORMATS
                .iter()
                .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
                .map(Value::Time)
        }),
        CoercionPath::Timestamp => to_temporal(sql_type, raw, parse_timestamp),
        CoercionPath::Fallback => fallback(sql_type, raw),
    }
}

/// 2^63: the first whole float outside the `i64` range.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn mismatch(sql_type: SqlType, raw: &RawCell) -> AdapterError {
    AdapterError::driver(format!(
        "cannot coerce {raw:?} as {sql_type:?} (type code {})",
        sql_type.code()
    ))
}

/// Decodes bytes as UTF-8, failing instead of substituting.
fn decode_utf8(sql_type: SqlType, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| {
        AdapterError::driver(format!(
            "invalid UTF-8 in {sql_type:?} value at byte {}",
            e.utf8_error().valid_up_to()
        ))
    })
}

fn text_of(sql_type: SqlType, raw: RawCell) -> Result<String> {
    match raw {
        RawCell::Text(s) => Ok(s),
        RawCell::Bytes(b) => decode_utf8(sql_type, b),
        other => Err(mismatch(sql_type, &other)),
    }
}

fn to_integer(sql_type: SqlType, raw: RawCell) -> Result<Value> {
    match raw {
        RawCell::Integer(v) => Ok(Value::Integer(v)),
        RawCell::Boolean(b) => Ok(Value::Integer(i64::from(b))),
        #[allow(clippy::cast_possible_truncation)]
        RawCell::Real(f) if f.fract() == 0.0 && (-I64_LIMIT..I64_LIMIT).contains(&f) => {
            Ok(Value::Integer(f as i64))
        }
        raw @ (RawCell::Text(_) | RawCell::Bytes(_)) => {
            let text = text_of(sql_type, raw)?;
            text.trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| AdapterError::driver(format!("invalid integer: {text:?}")))
        }
        other => Err(mismatch(sql_type, &other)),
    }
}

fn to_boolean(sql_type: SqlType, raw: RawCell) -> Result<Value> {
    match raw {
        RawCell::Boolean(b) => Ok(Value::Bool(b)),
        RawCell::Integer(v) => Ok(Value::Bool(v != 0)),
        raw @ (RawCell::Text(_) | RawCell::Bytes(_)) => {
            let text = text_of(sql_type, raw)?;
            match text.trim().to_ascii_lowercase().as_str() {
                "1" | "t" | "true" | "y" | "yes" => Ok(Value::Bool(true)),
                "0" | "f" | "false" | "n" | "no" => Ok(Value::Bool(false)),
                _ => Err(AdapterError::driver(format!("invalid boolean: {text:?}"))),
            }
        }
        other => Err(mismatch(sql_type, &other)),
    }
}

fn to_float(sql_type: SqlType, raw: RawCell) -> Result<Value> {
    match raw {
        RawCell::Real(f) => Ok(Value::Float(f)),
        #[allow(clippy::cast_precision_loss)]
        RawCell::Integer(v) => Ok(Value::Float(v as f64)),
        raw @ (RawCell::Text(_) | RawCell::Bytes(_)) => {
            let text = text_of(sql_type, raw)?;
            text.trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| AdapterError::driver(format!("invalid float: {text:?}")))
        }
        other => Err(mismatch(sql_type, &other)),
    }
}

fn to_decimal(sql_type: SqlType, raw: RawCell) -> Result<Value> {
    match raw {
        RawCell::Integer(v) => Ok(Value::Decimal(v.to_string())),
        RawCell::Real(f) if f.is_finite() => Ok(Value::Decimal(f.to_string())),
        raw @ (RawCell::Text(_) | RawCell::Bytes(_)) => {
            let text = text_of(sql_type, raw)?;
            let trimmed = text.trim();
            if !trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
                return Err(AdapterError::driver(format!("invalid decimal: {text:?}")));
            }
            Ok(Value::Decimal(trimmed.to_string()))
        }
        other => Err(mismatch(sql_type, &other)),
    }
}

fn to_text(sql_type: SqlType, raw: RawCell) -> Result<Value> {
    match raw {
        RawCell::Integer(v) => Ok(Value::Text(v.to_string())),
        RawCell::Real(f) => Ok(Value::Text(f.to_string())),
        RawCell::Boolean(b) => Ok(Value::Text(b.to_string())),
        raw => text_of(sql_type, raw).map(Value::Text),
    }
}

/// Large text objects are streamed by most drivers and arrive as bytes.
/// An empty object is an empty string, never absent.
fn to_large_text(sql_type: SqlType, raw: RawCell) -> Result<Value> {
    match raw {
        RawCell::Bytes(b) if b.is_empty() => Ok(Value::Text(String::new())),
        raw @ (RawCell::Text(_) | RawCell::Bytes(_)) => text_of(sql_type, raw).map(Value::Text),
        other => Err(mismatch(sql_type, &other)),
    }
}

fn to_binary(raw: RawCell) -> Value {
    match raw {
        RawCell::Bytes(b) => Value::Binary(b),
        RawCell::Text(s) => Value::Binary(s.into_bytes()),
        RawCell::Integer(v) => Value::Binary(v.to_string().into_bytes()),
        RawCell::Real(f) => Value::Binary(f.to_string().into_bytes()),
        RawCell::Boolean(b) => Value::Binary(vec![u8::from(b)]),
        RawCell::Null => Value::Absent,
    }
}

fn to_temporal(
    sql_type: SqlType,
    raw: RawCell,
    parse: impl Fn(&str) -> Option<Value>,
) -> Result<Value> {
    let text = text_of(sql_type, raw)?;
    parse(text.trim())
        .ok_or_else(|| AdapterError::driver(format!("invalid {sql_type:?} value: {text:?}")))
}

fn parse_timestamp(s: &str) -> Option<Value> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(Value::Timestamp)
}

fn fallback(sql_type: SqlType, raw: RawCell) -> Result<Value> {
    Ok(match raw {
        RawCell::Null => Value::Absent,
        RawCell::Integer(v) => Value::Integer(v),
        RawCell::Real(f) => Value::Float(f),
        RawCell::Boolean(b) => Value::Bool(b),
        RawCell::Text(s) => Value::Text(s),
        RawCell::Bytes(b) => match String::from_utf8(b) {
            Ok(s) => Value::Text(s),
            Err(e) => {
                tracing::debug!(?sql_type, "keeping undecodable fallback value as bytes");
                Value::Binary(e.into_bytes())
            }
        },
    })
}
