//! Turning backend responses into records.
//!
//! The backend client hands back either raw rows or a response envelope whose `data` field
//! carries the rows. [`Payload`] captures both; the envelope is unwrapped before anything
//! else happens. A JSON array then loads as [`Loaded::Many`] (input order kept) and anything
//! else as [`Loaded::One`].
//!
//! Loading is all or nothing: the first row that fails validation fails the load, and the
//! error carries that row's index along with every violation found in it.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use crate::db::record::{JsonMap, Row};
use crate::db::schema::Schema;
use crate::errors::{FieldViolation, Result, ValidationError, Violation};
use crate::types::json_kind;

/// Response envelope returned by the backend client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T = JsonValue> {
    pub data: T,
    /// Total row count, when the query asked for one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

impl<T> Response<T> {
    pub fn new(data: T) -> Self {
        Self { data, count: None }
    }
}

/// Input accepted by a load.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A response envelope; its `data` is loaded
    Envelope(Response),
    /// A raw row (object) or sequence of rows (array)
    Raw(JsonValue),
}

impl Payload {
    /// The rows to load, with any envelope removed.
    pub fn into_data(self) -> JsonValue {
        match self {
            Payload::Envelope(response) => {
                debug!(count = ?response.count, "Unwrapping response envelope");
                response.data
            }
            Payload::Raw(data) => data,
        }
    }
}

impl From<Response> for Payload {
    fn from(response: Response) -> Self {
        Payload::Envelope(response)
    }
}

impl From<Response<JsonMap>> for Payload {
    fn from(response: Response<JsonMap>) -> Self {
        Payload::Envelope(Response {
            data: JsonValue::Object(response.data),
            count: response.count,
        })
    }
}

impl From<Response<Vec<JsonMap>>> for Payload {
    fn from(response: Response<Vec<JsonMap>>) -> Self {
        Payload::Envelope(Response {
            data: JsonValue::Array(response.data.into_iter().map(JsonValue::Object).collect()),
            count: response.count,
        })
    }
}

impl From<JsonValue> for Payload {
    fn from(data: JsonValue) -> Self {
        Payload::Raw(data)
    }
}

impl From<JsonMap> for Payload {
    fn from(row: JsonMap) -> Self {
        Payload::Raw(JsonValue::Object(row))
    }
}

impl From<Vec<JsonMap>> for Payload {
    fn from(rows: Vec<JsonMap>) -> Self {
        Payload::Raw(JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect()))
    }
}

impl From<Vec<JsonValue>> for Payload {
    fn from(rows: Vec<JsonValue>) -> Self {
        Payload::Raw(JsonValue::Array(rows))
    }
}

/// What to do with columns a schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFields {
    /// Skip them (backends often return extra columns)
    #[default]
    Ignore,
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub unknown_fields: UnknownFields,
}

/// Result of a load: one record for a mapping, a sequence for an array.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Loaded<T> {
    pub fn is_many(&self) -> bool {
        matches!(self, Loaded::Many(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Loaded::One(_) => 1,
            Loaded::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Loaded<U> {
        match self {
            Loaded::One(item) => Loaded::One(f(item)),
            Loaded::Many(items) => Loaded::Many(items.into_iter().map(f).collect()),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Loaded::One(item) => vec![item],
            Loaded::Many(items) => items,
        }
    }

    /// The single record, if the payload was a mapping.
    pub fn one(self) -> Option<T> {
        match self {
            Loaded::One(item) => Some(item),
            Loaded::Many(_) => None,
        }
    }
}

#[instrument(skip_all, fields(table = schema.table_name))]
pub fn load_rows(schema: &'static Schema, payload: Payload, options: &LoadOptions) -> Result<Loaded<Row>> {
    match payload.into_data() {
        JsonValue::Array(items) => {
            let rows = items
                .iter()
                .enumerate()
                .map(|(i, item)| row_from_json(schema, item, options).map_err(|e| e.at_row(i)))
                .collect::<Result<Vec<_>>>()?;
            debug!(rows = rows.len(), "Loaded rows");
            Ok(Loaded::Many(rows))
        }
        other => row_from_json(schema, &other, options).map(Loaded::One),
    }
}

fn row_from_json(schema: &'static Schema, raw: &JsonValue, options: &LoadOptions) -> Result<Row> {
    match raw {
        JsonValue::Object(map) => Row::from_json(schema, map, options.unknown_fields),
        other => Err(ValidationError::new(
            schema.entity,
            vec![FieldViolation::new("", Violation::NotAMapping { found: json_kind(other) })],
        )),
    }
}
