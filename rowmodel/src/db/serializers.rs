//! JSON-safe serialization of record values.
//!
//! Dumping a record turns every value into something the backend client can send as JSON.
//! Rather than inspecting each value on every call, serialization looks the value's
//! [`ValueKind`] up in an immutable table built once on first use:
//!
//! | kind | JSON form |
//! |---|---|
//! | timestamp | ISO-8601 with offset (`2024-05-01T12:00:00+00:00`) |
//! | date / time | ISO-8601 (`2024-05-01`, `12:00:00.500`) |
//! | decimal | exact decimal string (`"10.99"`) |
//! | uuid | hyphenated string |
//! | bytes | standard base64 (`"YWI="`) |
//! | relation | the related record's own dump |
//! | everything else | passed through unchanged |
//!
//! The table holds an entry for every kind, passthrough kinds included, so
//! [`crate::db::models::verify_schemas`] can confirm at start-up that each declared field
//! type has a serializer.

use base64::{Engine as _, engine::general_purpose};
use chrono::SecondsFormat;
use once_cell::sync::Lazy;
use serde_json::{Number, Value as JsonValue};
use std::collections::HashMap;

use crate::types::{Value, ValueKind};

/// A pure formatting function from a record value to JSON.
pub type Serializer = fn(&Value) -> JsonValue;

static SERIALIZERS: Lazy<HashMap<ValueKind, Serializer>> = Lazy::new(|| {
    let entries: [(ValueKind, Serializer); 12] = [
        (ValueKind::Null, passthrough),
        (ValueKind::Bool, passthrough),
        (ValueKind::Integer, passthrough),
        (ValueKind::Float, passthrough),
        (ValueKind::Text, passthrough),
        (ValueKind::Decimal, decimal_string),
        (ValueKind::Timestamp, iso_timestamp),
        (ValueKind::Date, iso_date),
        (ValueKind::Time, iso_time),
        (ValueKind::Uuid, uuid_string),
        (ValueKind::Bytes, base64_bytes),
        (ValueKind::Relation, nested_dump),
    ];
    HashMap::from(entries)
});

/// Serializer registered for `kind`.
pub fn serializer_for(kind: ValueKind) -> Option<Serializer> {
    SERIALIZERS.get(&kind).copied()
}

/// Serialize a single value through the table.
pub fn serialize(value: &Value) -> JsonValue {
    match serializer_for(value.kind()) {
        Some(serializer) => serializer(value),
        None => passthrough(value),
    }
}

fn passthrough(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::Number((*i).into()),
        // JSON has no NaN or infinity
        Value::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        Value::Text(s) => JsonValue::String(s.clone()),
        other => JsonValue::String(other.to_string()),
    }
}

fn decimal_string(value: &Value) -> JsonValue {
    match value {
        Value::Decimal(d) => JsonValue::String(d.to_string()),
        other => passthrough(other),
    }
}

fn iso_timestamp(value: &Value) -> JsonValue {
    match value {
        Value::Timestamp(ts) => JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
        other => passthrough(other),
    }
}

fn iso_date(value: &Value) -> JsonValue {
    match value {
        Value::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
        other => passthrough(other),
    }
}

fn iso_time(value: &Value) -> JsonValue {
    match value {
        Value::Time(t) => JsonValue::String(t.format("%H:%M:%S%.f").to_string()),
        other => passthrough(other),
    }
}

fn uuid_string(value: &Value) -> JsonValue {
    match value {
        Value::Uuid(u) => JsonValue::String(u.to_string()),
        other => passthrough(other),
    }
}

fn base64_bytes(value: &Value) -> JsonValue {
    match value {
        Value::Bytes(b) => JsonValue::String(general_purpose::STANDARD.encode(b)),
        other => passthrough(other),
    }
}

fn nested_dump(value: &Value) -> JsonValue {
    match value {
        Value::Relation(row) => JsonValue::Object(row.dump()),
        other => passthrough(other),
    }
}
