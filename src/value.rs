//! Semantic field model - declared field types and their values
//!
//! Every entity field carries one of the semantic types below. The engine
//! keeps values in this closed union in memory and converts to the four
//! storage primitives at the marshalling boundary:
//! - `Integer` / `Unsigned` / `Bool` -> integer columns
//! - `Text` / `Char` / `Uuid` / `Color` / `Date` / `Time` / `DateTime` -> text columns
//! - `Real` -> real columns
//! - `Blob` -> blob columns

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Semantic type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Signed 64-bit integer (also backs primary and foreign keys)
    Integer,
    /// Unsigned 64-bit integer
    Unsigned,
    /// Boolean flag
    Bool,
    /// UTF-8 string
    Text,
    /// Single character
    Char,
    /// UUID
    Uuid,
    /// RGB color
    Color,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Combined date and time
    DateTime,
    /// 64-bit float
    Real,
    /// Raw bytes
    Blob,
}

impl FieldType {
    /// Get the string representation of the field type
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Unsigned => "unsigned",
            FieldType::Bool => "bool",
            FieldType::Text => "text",
            FieldType::Char => "char",
            FieldType::Uuid => "uuid",
            FieldType::Color => "color",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "datetime",
            FieldType::Real => "real",
            FieldType::Blob => "blob",
        }
    }

    /// Get all field types
    pub fn all() -> &'static [FieldType] {
        &[
            FieldType::Integer,
            FieldType::Unsigned,
            FieldType::Bool,
            FieldType::Text,
            FieldType::Char,
            FieldType::Uuid,
            FieldType::Color,
            FieldType::Date,
            FieldType::Time,
            FieldType::DateTime,
            FieldType::Real,
            FieldType::Blob,
        ]
    }

    /// The zero value a freshly constructed record carries for this type
    pub fn zero(&self) -> Value {
        match self {
            FieldType::Integer => Value::Integer(0),
            FieldType::Unsigned => Value::Unsigned(0),
            FieldType::Bool => Value::Bool(false),
            FieldType::Text => Value::Text(String::new()),
            FieldType::Char => Value::Char('\0'),
            FieldType::Uuid => Value::Uuid(Uuid::nil()),
            FieldType::Color => Value::Color(Color::default()),
            FieldType::Date => Value::Date(NaiveDate::default()),
            FieldType::Time => Value::Time(NaiveTime::default()),
            FieldType::DateTime => Value::DateTime(NaiveDateTime::default()),
            FieldType::Real => Value::Real(0.0),
            FieldType::Blob => Value::Blob(Vec::new()),
        }
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "integer" | "int" | "long" => Ok(FieldType::Integer),
            "unsigned" | "uint" | "ulong" => Ok(FieldType::Unsigned),
            "bool" | "boolean" => Ok(FieldType::Bool),
            "text" | "string" | "str" => Ok(FieldType::Text),
            "char" => Ok(FieldType::Char),
            "uuid" => Ok(FieldType::Uuid),
            "color" | "colour" => Ok(FieldType::Color),
            "date" => Ok(FieldType::Date),
            "time" => Ok(FieldType::Time),
            "datetime" | "date-time" | "timestamp" => Ok(FieldType::DateTime),
            "real" | "double" | "float" => Ok(FieldType::Real),
            "blob" | "binary" | "bytes" => Ok(FieldType::Blob),
            _ => Err(Error::InvalidValue(format!("Unknown field type: {}", s))),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An RGB color, marshalled to text as `#rrggbb`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase hex form, e.g. `#7be7ff`
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidValue(format!("Invalid color: {}", s)));
        }

        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
        Ok(Self { r, g, b })
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hex())
    }
}

/// A semantic field value.
///
/// One variant per [`FieldType`]; a record's value vector holds exactly one
/// of these per declared field, always of the declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Integer(i64),
    Unsigned(u64),
    Bool(bool),
    Text(String),
    Char(char),
    Uuid(Uuid),
    Color(Color),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Real(f64),
    Blob(Vec<u8>),
}

impl Value {
    /// The semantic type this value belongs to
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Integer(_) => FieldType::Integer,
            Value::Unsigned(_) => FieldType::Unsigned,
            Value::Bool(_) => FieldType::Bool,
            Value::Text(_) => FieldType::Text,
            Value::Char(_) => FieldType::Char,
            Value::Uuid(_) => FieldType::Uuid,
            Value::Color(_) => FieldType::Color,
            Value::Date(_) => FieldType::Date,
            Value::Time(_) => FieldType::Time,
            Value::DateTime(_) => FieldType::DateTime,
            Value::Real(_) => FieldType::Real,
            Value::Blob(_) => FieldType::Blob,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Value::Unsigned(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Unsigned(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_roundtrip() {
        for ty in FieldType::all() {
            let s = ty.as_str();
            let parsed: FieldType = s.parse().unwrap();
            assert_eq!(*ty, parsed);
        }
    }

    #[test]
    fn test_field_type_aliases() {
        assert_eq!(FieldType::from_str("string").unwrap(), FieldType::Text);
        assert_eq!(FieldType::from_str("long").unwrap(), FieldType::Integer);
        assert_eq!(FieldType::from_str("double").unwrap(), FieldType::Real);
        assert_eq!(FieldType::from_str("timestamp").unwrap(), FieldType::DateTime);
    }

    #[test]
    fn test_zero_values_match_declared_type() {
        for ty in FieldType::all() {
            assert_eq!(ty.zero().field_type(), *ty);
        }
    }

    #[test]
    fn test_color_hex_roundtrip() {
        let color = Color::new(123, 231, 255);
        let parsed: Color = color.hex().parse().unwrap();
        assert_eq!(color, parsed);
        assert_eq!(color.hex(), "#7be7ff");
    }

    #[test]
    fn test_color_rejects_malformed() {
        assert!(Color::from_str("#12345").is_err());
        assert!(Color::from_str("not-a-color").is_err());
    }

    #[test]
    fn test_value_serde_roundtrip() {
        let value = Value::Color(Color::new(1, 2, 3));
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }
}
