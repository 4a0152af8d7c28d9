//! Type marshalling - semantic values to and from storage primitives
//!
//! SQLite stores four physical column kinds. Every semantic [`FieldType`]
//! maps onto exactly one of them, and the conversion is bidirectional:
//! `from_storage(ty, &to_storage(&v))` reproduces `v` exactly for every
//! supported type. Dates and times travel as text in fixed formats that
//! preserve full precision.

use crate::value::{FieldType, Value};
use rusqlite::types::{self, ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};

/// Text format for date columns
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Text format for time columns; the fraction is omitted when zero
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";
/// Text format for date-time columns
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// The four physical column kinds the storage engine supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageClass {
    Integer,
    Text,
    Real,
    Blob,
}

impl StorageClass {
    /// SQL column type keyword for CREATE TABLE statements
    pub fn as_sql(&self) -> &'static str {
        match self {
            StorageClass::Integer => "INTEGER",
            StorageClass::Text => "TEXT",
            StorageClass::Real => "REAL",
            StorageClass::Blob => "BLOB",
        }
    }
}

impl FieldType {
    /// The storage class a column of this semantic type is declared as
    pub fn storage_class(&self) -> StorageClass {
        match self {
            FieldType::Integer | FieldType::Unsigned | FieldType::Bool => StorageClass::Integer,
            FieldType::Text
            | FieldType::Char
            | FieldType::Uuid
            | FieldType::Color
            | FieldType::Date
            | FieldType::Time
            | FieldType::DateTime => StorageClass::Text,
            FieldType::Real => StorageClass::Real,
            FieldType::Blob => StorageClass::Blob,
        }
    }
}

/// A storage-level value: one of the four primitives, or null.
///
/// This is the only type that crosses the boundary to the SQL layer;
/// everything above it deals in semantic [`Value`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// Convert a semantic value to its storage form.
pub fn to_storage(value: &Value) -> SqlValue {
    match value {
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Unsigned(u) => SqlValue::Integer(*u as i64),
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Char(c) => SqlValue::Text(c.to_string()),
        Value::Uuid(u) => SqlValue::Text(u.to_string()),
        Value::Color(c) => SqlValue::Text(c.hex()),
        Value::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
        Value::Time(t) => SqlValue::Text(t.format(TIME_FORMAT).to_string()),
        Value::DateTime(dt) => SqlValue::Text(dt.format(DATE_TIME_FORMAT).to_string()),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

/// Convert a storage value back to the declared semantic type.
///
/// Returns `None` when the stored value does not fit the declared type
/// (wrong storage class, unparsable text, null). Callers leave the
/// in-memory field untouched in that case.
pub fn from_storage(ty: FieldType, value: &SqlValue) -> Option<Value> {
    match (ty, value) {
        (FieldType::Integer, SqlValue::Integer(i)) => Some(Value::Integer(*i)),
        (FieldType::Unsigned, SqlValue::Integer(i)) => Some(Value::Unsigned(*i as u64)),
        (FieldType::Bool, SqlValue::Integer(i)) => Some(Value::Bool(*i != 0)),
        (FieldType::Text, SqlValue::Text(s)) => Some(Value::Text(s.clone())),
        (FieldType::Char, SqlValue::Text(s)) => s.chars().next().map(Value::Char),
        (FieldType::Uuid, SqlValue::Text(s)) => s.parse().ok().map(Value::Uuid),
        (FieldType::Color, SqlValue::Text(s)) => s.parse().ok().map(Value::Color),
        (FieldType::Date, SqlValue::Text(s)) => {
            chrono::NaiveDate::parse_from_str(s, DATE_FORMAT).ok().map(Value::Date)
        }
        (FieldType::Time, SqlValue::Text(s)) => {
            chrono::NaiveTime::parse_from_str(s, TIME_FORMAT).ok().map(Value::Time)
        }
        (FieldType::DateTime, SqlValue::Text(s)) => {
            chrono::NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT).ok().map(Value::DateTime)
        }
        (FieldType::Real, SqlValue::Real(r)) => Some(Value::Real(*r)),
        (FieldType::Blob, SqlValue::Blob(b)) => Some(Value::Blob(b.clone())),
        _ => None,
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(types::Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(types::Value::Integer(*i)),
            SqlValue::Real(r) => ToSqlOutput::Owned(types::Value::Real(*r)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(types::ValueRef::Text(s.as_bytes())),
            SqlValue::Blob(b) => ToSqlOutput::Borrowed(types::ValueRef::Blob(b)),
        })
    }
}

impl From<types::Value> for SqlValue {
    fn from(value: types::Value) -> Self {
        match value {
            types::Value::Null => SqlValue::Null,
            types::Value::Integer(i) => SqlValue::Integer(i),
            types::Value::Real(r) => SqlValue::Real(r),
            types::Value::Text(s) => SqlValue::Text(s),
            types::Value::Blob(b) => SqlValue::Blob(b),
        }
    }
}
