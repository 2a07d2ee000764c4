//! Semantic value model shared by every table model.
//!
//! This module defines:
//! - [`Value`]: an in-memory column value, one variant per semantic type
//! - [`ValueKind`]: the tag of a [`Value`], used as the key of the serializer table
//! - [`FieldType`]: the declared type of a column, which decides what a field accepts
//!
//! # Accepting values
//!
//! Values reach a record from two places: callers constructing a record in code, and raw
//! JSON rows returned by the backend. [`FieldType::accept`] checks a caller-supplied
//! [`Value`] against the declared type, widening only where no information is lost
//! (integer into float or decimal). [`FieldType::parse_json`] turns a JSON scalar into a
//! typed value, parsing the string forms that [`crate::db::serializers`] produces on dump.
//!
//! Every field is nullable in memory; whether a null is acceptable is decided later by the
//! required-field check.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value as JsonValue};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::db::record::Row;
use crate::db::schema::Schema;
use crate::errors::Violation;

/// A single column value held by a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Arbitrary precision decimal, dumped as its exact string form
    Decimal(Decimal),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    /// An expanded related row (e.g. `categories(*)` selected alongside a product)
    Relation(Box<Row>),
}

/// Tag identifying the variant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    Text,
    Decimal,
    Timestamp,
    Date,
    Time,
    Uuid,
    Bytes,
    Relation,
}

impl ValueKind {
    pub const ALL: [ValueKind; 12] = [
        ValueKind::Null,
        ValueKind::Bool,
        ValueKind::Integer,
        ValueKind::Float,
        ValueKind::Text,
        ValueKind::Decimal,
        ValueKind::Timestamp,
        ValueKind::Date,
        ValueKind::Time,
        ValueKind::Uuid,
        ValueKind::Bytes,
        ValueKind::Relation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Decimal => "decimal",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::Uuid => "uuid",
            ValueKind::Bytes => "bytes",
            ValueKind::Relation => "relation",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Relation(_) => ValueKind::Relation,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Numeric view used by bound constraints. Floats go through their shortest
    /// round-trip string so `0.5` compares as exactly `0.5`.
    pub(crate) fn numeric(&self) -> Option<Decimal> {
        match self {
            Value::Integer(i) => Some(Decimal::from(*i)),
            Value::Float(f) => decimal_from_f64(*f),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

/// Human readable rendering used by record text representations.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Decimal(d) => write!(f, "Decimal('{d}')"),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Bytes(b) => write!(f, "b'{}'", b.escape_ascii()),
            Value::Relation(row) => write!(f, "{row}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
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

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
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

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Declared semantic type of a column.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    Integer,
    Float,
    Boolean,
    Text,
    Decimal,
    /// Text restricted to the listed variants (a Postgres enum type)
    Enum(&'static [&'static str]),
    Timestamp,
    Date,
    Time,
    Uuid,
    Bytes,
    /// Expanded row of another table
    Relation(&'static Schema),
}

impl FieldType {
    /// The kind of value stored for this field once accepted.
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldType::Integer => ValueKind::Integer,
            FieldType::Float => ValueKind::Float,
            FieldType::Boolean => ValueKind::Bool,
            FieldType::Text | FieldType::Enum(_) => ValueKind::Text,
            FieldType::Decimal => ValueKind::Decimal,
            FieldType::Timestamp => ValueKind::Timestamp,
            FieldType::Date => ValueKind::Date,
            FieldType::Time => ValueKind::Time,
            FieldType::Uuid => ValueKind::Uuid,
            FieldType::Bytes => ValueKind::Bytes,
            FieldType::Relation(_) => ValueKind::Relation,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Enum(_) => "enum",
            FieldType::Relation(schema) => schema.entity,
            other => other.kind().name(),
        }
    }

    /// Check a caller-supplied value against this type.
    pub fn accept(&self, value: Value) -> Result<Value, Violation> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (FieldType::Integer, v @ Value::Integer(_)) => Ok(v),
            (FieldType::Float, v @ Value::Float(_)) => Ok(v),
            (FieldType::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (FieldType::Boolean, v @ Value::Bool(_)) => Ok(v),
            (FieldType::Text, v @ Value::Text(_)) => Ok(v),
            (FieldType::Enum(allowed), Value::Text(s)) => check_variant(allowed, s),
            (FieldType::Decimal, v @ Value::Decimal(_)) => Ok(v),
            (FieldType::Decimal, Value::Integer(i)) => Ok(Value::Decimal(Decimal::from(i))),
            (FieldType::Decimal, Value::Float(f)) => decimal_from_f64(f)
                .map(Value::Decimal)
                .ok_or_else(|| Violation::InvalidFormat {
                    expected: "decimal",
                    reason: if f.is_finite() {
                        format!("{f:e} is out of decimal range")
                    } else {
                        format!("{f} is not a finite number")
                    },
                }),
            (FieldType::Timestamp, v @ Value::Timestamp(_)) => Ok(v),
            (FieldType::Date, v @ Value::Date(_)) => Ok(v),
            (FieldType::Time, v @ Value::Time(_)) => Ok(v),
            (FieldType::Uuid, v @ Value::Uuid(_)) => Ok(v),
            (FieldType::Bytes, v @ Value::Bytes(_)) => Ok(v),
            (FieldType::Relation(schema), Value::Relation(row)) if row.schema().table_name == schema.table_name => {
                Ok(Value::Relation(row))
            }
            (ty, other) => Err(Violation::TypeMismatch {
                expected: ty.name(),
                found: other.kind().name(),
            }),
        }
    }

    /// Parse a raw JSON scalar returned by the backend.
    ///
    /// Relations are not scalars; they are parsed by [`Row`] so that nested violations keep
    /// their field paths.
    pub fn parse_json(&self, raw: &JsonValue) -> Result<Value, Violation> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = || Violation::TypeMismatch {
            expected: self.name(),
            found: json_kind(raw),
        };

        match self {
            FieldType::Integer => match raw {
                JsonValue::Number(n) if n.as_i64().is_none() && is_integer_literal(n) => {
                    Err(Violation::InvalidFormat {
                        expected: "integer",
                        reason: "out of range for i64".to_string(),
                    })
                }
                _ => raw.as_i64().map(Value::Integer).ok_or_else(mismatch),
            },
            FieldType::Float => raw.as_f64().map(Value::Float).ok_or_else(mismatch),
            FieldType::Boolean => raw.as_bool().map(Value::Bool).ok_or_else(mismatch),
            FieldType::Text => raw.as_str().map(|s| Value::Text(s.to_string())).ok_or_else(mismatch),
            FieldType::Enum(allowed) => match raw.as_str() {
                Some(s) => check_variant(allowed, s.to_string()),
                None => Err(mismatch()),
            },
            FieldType::Decimal => match raw {
                JsonValue::Number(n) => parse_decimal(&n.to_string()),
                JsonValue::String(s) => parse_decimal(s),
                _ => Err(mismatch()),
            },
            FieldType::Timestamp => raw.as_str().ok_or_else(mismatch).and_then(parse_timestamp),
            FieldType::Date => {
                let s = raw.as_str().ok_or_else(mismatch)?;
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(Value::Date)
                    .map_err(|e| invalid("date", e))
            }
            FieldType::Time => {
                let s = raw.as_str().ok_or_else(mismatch)?;
                NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                    .map(Value::Time)
                    .map_err(|e| invalid("time", e))
            }
            FieldType::Uuid => {
                let s = raw.as_str().ok_or_else(mismatch)?;
                Uuid::parse_str(s).map(Value::Uuid).map_err(|e| invalid("uuid", e))
            }
            FieldType::Bytes => {
                let s = raw.as_str().ok_or_else(mismatch)?;
                general_purpose::STANDARD
                    .decode(s)
                    .map(Value::Bytes)
                    .map_err(|e| invalid("base64 bytes", e))
            }
            FieldType::Relation(_) => Err(mismatch()),
        }
    }
}

fn check_variant(allowed: &'static [&'static str], s: String) -> Result<Value, Violation> {
    if allowed.contains(&s.as_str()) {
        Ok(Value::Text(s))
    } else {
        Err(Violation::InvalidVariant { allowed })
    }
}

fn invalid(expected: &'static str, err: impl fmt::Display) -> Violation {
    Violation::InvalidFormat {
        expected,
        reason: err.to_string(),
    }
}

fn parse_decimal(s: &str) -> Result<Value, Violation> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map(Value::Decimal)
        .map_err(|e| invalid("decimal", e))
}

/// RFC 3339 first; timestamps without an offset (`timestamp` columns) are taken as UTC.
fn parse_timestamp(s: &str) -> Result<Value, Violation> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(Value::Timestamp(ts.with_timezone(&Utc)));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Value::Timestamp(naive.and_utc()))
        .ok_or_else(|| Violation::InvalidFormat {
            expected: "timestamp",
            reason: format!("'{s}' is not an ISO-8601 timestamp"),
        })
}

fn decimal_from_f64(f: f64) -> Option<Decimal> {
    if !f.is_finite() {
        return None;
    }
    let s = f.to_string();
    Decimal::from_str(&s).or_else(|_| Decimal::from_scientific(&s)).ok()
}

/// Numbers keep their source text, so an integer is a literal without fraction or exponent.
fn is_integer_literal(n: &Number) -> bool {
    !n.to_string().contains(['.', 'e', 'E'])
}

pub(crate) fn json_kind(raw: &JsonValue) -> &'static str {
    match raw {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if is_integer_literal(n) => "integer",
        JsonValue::Number(_) => "float",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
