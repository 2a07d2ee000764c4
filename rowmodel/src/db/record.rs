//! Records: validated in-memory rows.
//!
//! [`Row`] is the type-erased record. It pairs a `'static` [`Schema`] with the field values
//! and a companion set of the fields the caller assigned explicitly. [`Record<E>`] wraps a
//! row whose schema belongs to entity `E` and adds typed construction and loading.
//!
//! # Construction
//!
//! All fields are assigned first, then the row is validated as a whole:
//!
//! 1. client-side defaults are resolved for fields that were not assigned
//! 2. every non-null value is checked against its field's constraints
//! 3. the required-field stage lists every required field still null
//!
//! Every violation from all three stages is reported in one [`ValidationError`].
//!
//! # Dumping
//!
//! [`Row::dump`] only emits fields the caller set, at construction, on load or through
//! [`Row::set`]. Unset and defaulted fields are left out so the backend applies its own
//! defaults on insert.
//!
//! ```ignore
//! use rowmodel::{Product, Record};
//!
//! let product = Record::<Product>::new([("name", "Widget".into()), ("sku", "AB-123".into())])?;
//! client.table(Product::table_name()).insert(product.dump());
//! ```

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

use crate::db::load::{self, LoadOptions, Loaded, Payload, UnknownFields};
use crate::db::schema::{FieldSpec, Schema};
use crate::db::serializers;
use crate::errors::{FieldViolation, Result, ValidationError, Violation};
use crate::types::{FieldType, Value, json_kind};

/// JSON object as produced by [`Row::dump`] and accepted by [`Row::from_json`].
pub type JsonMap = Map<String, JsonValue>;

static NULL: Value = Value::Null;

/// A table model. Implementors declare their schema once as a `static`.
pub trait Entity: 'static {
    fn schema() -> &'static Schema;

    fn table_name() -> &'static str {
        Self::schema().table_name
    }
}

/// A validated row of any table.
#[derive(Clone)]
pub struct Row {
    schema: &'static Schema,
    values: BTreeMap<&'static str, Value>,
    fields_set: BTreeSet<&'static str>,
}

impl Row {
    /// Construct a row from caller-supplied values. Unknown field names are rejected.
    pub fn new<'a>(schema: &'static Schema, fields: impl IntoIterator<Item = (&'a str, Value)>) -> Result<Self> {
        let mut row = Self::empty(schema);
        let mut violations = Vec::new();

        for (name, value) in fields {
            let Some(spec) = schema.field(name) else {
                violations.push(FieldViolation::new(name, Violation::UnknownField));
                continue;
            };
            match spec.ty.accept(value) {
                Ok(value) => row.assign(spec, value),
                Err(violation) => violations.push(FieldViolation::new(spec.name, violation)),
            }
        }

        row.finish(violations)
    }

    /// Construct a row from a raw JSON object returned by the backend.
    pub fn from_json(schema: &'static Schema, map: &JsonMap, unknown_fields: UnknownFields) -> Result<Self> {
        let mut row = Self::empty(schema);
        let mut violations = Vec::new();

        for (name, raw) in map {
            let Some(spec) = schema.field(name) else {
                match unknown_fields {
                    UnknownFields::Ignore => debug!(table = schema.table_name, field = %name, "Ignoring unknown field"),
                    UnknownFields::Reject => violations.push(FieldViolation::new(name.as_str(), Violation::UnknownField)),
                }
                continue;
            };
            match value_from_json(spec, raw, unknown_fields) {
                Ok(value) => row.assign(spec, value),
                Err(errors) => violations.extend(errors),
            }
        }

        row.finish(violations)
    }

    /// Load one row or a sequence of rows for `schema` from a raw payload or response envelope.
    pub fn load(schema: &'static Schema, payload: impl Into<Payload>, options: &LoadOptions) -> Result<Loaded<Row>> {
        load::load_rows(schema, payload.into(), options)
    }

    fn empty(schema: &'static Schema) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
            fields_set: BTreeSet::new(),
        }
    }

    fn assign(&mut self, spec: &'static FieldSpec, value: Value) {
        self.values.insert(spec.name, value);
        self.fields_set.insert(spec.name);
    }

    fn finish(mut self, mut violations: Vec<FieldViolation>) -> Result<Self> {
        self.resolve_defaults();

        for spec in self.schema.fields {
            if let Some(value) = self.values.get(spec.name) {
                violations.extend(spec.check(value).into_iter().map(|v| FieldViolation::new(spec.name, v)));
            }
        }

        // A field already reported for a bad value is not reported again as missing
        let missing: Vec<&'static str> = self
            .missing_required()
            .into_iter()
            .filter(|name| !violations.iter().any(|v| v.field == *name))
            .collect();
        violations.extend(missing.into_iter().map(|name| FieldViolation::new(name, Violation::Required)));

        if violations.is_empty() {
            Ok(self)
        } else {
            Err(ValidationError::new(self.schema.entity, violations))
        }
    }

    fn resolve_defaults(&mut self) {
        for spec in self.schema.fields {
            if let Some(default) = spec.default
                && !self.values.contains_key(spec.name)
            {
                self.values.insert(spec.name, default());
            }
        }
    }

    /// Required-field stage: every required field that is null, in declaration order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.schema
            .required
            .iter()
            .copied()
            .filter(|name| self.get(name).is_none_or(Value::is_null))
            .collect()
    }

    /// Assign a single field. The value is validated on its own (type, constraints and
    /// non-null when required) and the field is marked as set.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let entity = self.schema.entity;
        let fail = |field: &str, violations: Vec<Violation>| {
            ValidationError::new(
                entity,
                violations.into_iter().map(|v| FieldViolation::new(field, v)).collect(),
            )
        };

        let Some(spec) = self.schema.field(field) else {
            return Err(fail(field, vec![Violation::UnknownField]));
        };
        let value = spec.ty.accept(value.into()).map_err(|v| fail(spec.name, vec![v]))?;

        let mut violations = spec.check(&value);
        if value.is_null() && self.schema.is_required(spec.name) {
            violations.push(Violation::Required);
        }
        if !violations.is_empty() {
            return Err(fail(spec.name, violations));
        }

        self.assign(spec, value);
        Ok(())
    }

    /// Current value of `field`; `Value::Null` when unset, `None` when the table has no such field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        let spec = self.schema.field(field)?;
        Some(self.values.get(spec.name).unwrap_or(&NULL))
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.fields_set.contains(field)
    }

    /// Explicitly set fields, in name order.
    pub fn fields_set(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields_set.iter().copied()
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn table_name(&self) -> &'static str {
        self.schema.table_name
    }

    /// JSON-safe mapping of the explicitly set fields, in column order.
    pub fn dump(&self) -> JsonMap {
        self.schema
            .fields
            .iter()
            .filter(|spec| self.fields_set.contains(spec.name))
            .map(|spec| {
                let value = self.values.get(spec.name).unwrap_or(&NULL);
                (spec.name.to_string(), serializers::serialize(value))
            })
            .collect()
    }

    /// Iterate the `(field, value)` pairs of [`Row::dump`].
    pub fn iter(&self) -> serde_json::map::IntoIter {
        self.dump().into_iter()
    }

    pub(crate) fn text(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(Value::as_str)
    }

    pub(crate) fn integer(&self, field: &str) -> Option<i64> {
        self.values.get(field).and_then(Value::as_i64)
    }

    pub(crate) fn decimal(&self, field: &str) -> Option<rust_decimal::Decimal> {
        self.values.get(field).and_then(Value::as_decimal)
    }

    pub(crate) fn timestamp(&self, field: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        match self.values.get(field) {
            Some(Value::Timestamp(ts)) => Some(*ts),
            _ => None,
        }
    }

    pub(crate) fn relation(&self, field: &str) -> Option<&Row> {
        match self.values.get(field) {
            Some(Value::Relation(row)) => Some(row),
            _ => None,
        }
    }
}

fn value_from_json(
    spec: &'static FieldSpec,
    raw: &JsonValue,
    unknown_fields: UnknownFields,
) -> std::result::Result<Value, Vec<FieldViolation>> {
    match (spec.ty, raw) {
        (FieldType::Relation(_), JsonValue::Null) => Ok(Value::Null),
        (FieldType::Relation(schema), JsonValue::Object(map)) => Row::from_json(schema, map, unknown_fields)
            .map(|row| Value::Relation(Box::new(row)))
            .map_err(|err| {
                err.into_violations()
                    .into_iter()
                    .map(|v| v.nested_under(spec.name))
                    .collect()
            }),
        (FieldType::Relation(_), other) => Err(vec![FieldViolation::new(
            spec.name,
            Violation::NotAMapping { found: json_kind(other) },
        )]),
        (ty, raw) => ty.parse_json(raw).map_err(|v| vec![FieldViolation::new(spec.name, v)]),
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.schema.table_name == other.schema.table_name
            && self.values == other.values
            && self.fields_set == other.fields_set
    }
}

/// Full field-by-field rendering, unset fields included: `Category(id=1, name='Tools', nickname=None)`.
impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.schema.entity)?;
        for (i, spec) in self.schema.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", spec.name, self.values.get(spec.name).unwrap_or(&NULL))?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.schema.entity);
        for spec in self.schema.fields {
            if let Some(value) = self.values.get(spec.name) {
                s.field(spec.name, value);
            }
        }
        s.finish_non_exhaustive()
    }
}

/// Serializes as [`Row::dump`], so a row can be handed straight to a JSON client.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.dump().serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (String, JsonValue);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A validated row of entity `E`.
pub struct Record<E: Entity> {
    row: Row,
    entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Record<E> {
    /// Construct and validate a record from field values.
    ///
    /// ```ignore
    /// let category = Record::<Category>::new([("name", "Tools".into())])?;
    /// ```
    pub fn new<'a>(fields: impl IntoIterator<Item = (&'a str, Value)>) -> Result<Self> {
        Row::new(E::schema(), fields).map(Self::wrap)
    }

    /// Construct from a raw JSON object, ignoring columns the schema does not declare.
    pub fn from_json(map: &JsonMap) -> Result<Self> {
        Row::from_json(E::schema(), map, UnknownFields::Ignore).map(Self::wrap)
    }

    /// Load a raw row, a raw sequence of rows, or a response envelope.
    ///
    /// A sequence yields [`Loaded::Many`] in input order; a single mapping yields
    /// [`Loaded::One`]. The first failing row fails the whole load.
    pub fn load(payload: impl Into<Payload>) -> Result<Loaded<Self>> {
        Self::load_with(payload, &LoadOptions::default())
    }

    pub fn load_with(payload: impl Into<Payload>, options: &LoadOptions) -> Result<Loaded<Self>> {
        Row::load(E::schema(), payload, options).map(|loaded| loaded.map(Self::wrap))
    }

    /// Load a payload that must hold exactly one mapping.
    pub fn load_one(payload: impl Into<Payload>) -> Result<Self> {
        match Self::load(payload)? {
            Loaded::One(record) => Ok(record),
            Loaded::Many(_) => Err(ValidationError::new(
                E::schema().entity,
                vec![FieldViolation::new("", Violation::NotAMapping { found: "array" })],
            )),
        }
    }

    /// Load a payload as a sequence; a single mapping becomes a one-element vector.
    pub fn load_many(payload: impl Into<Payload>) -> Result<Vec<Self>> {
        Self::load(payload).map(Loaded::into_vec)
    }

    /// Re-type an untyped row. Fails if the row belongs to another table.
    pub fn from_row(row: Row) -> Result<Self> {
        let schema = E::schema();
        if row.schema.table_name != schema.table_name {
            return Err(ValidationError::new(
                schema.entity,
                vec![FieldViolation::new(
                    "",
                    Violation::TypeMismatch {
                        expected: schema.entity,
                        found: row.schema.entity,
                    },
                )],
            ));
        }
        Ok(Self::wrap(row))
    }

    pub(crate) fn wrap(row: Row) -> Self {
        Self {
            row,
            entity: PhantomData,
        }
    }

    pub fn table_name() -> &'static str {
        E::table_name()
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        self.row.set(field, value)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.row.get(field)
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.row.is_set(field)
    }

    pub fn fields_set(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.row.fields_set()
    }

    pub fn dump(&self) -> JsonMap {
        self.row.dump()
    }

    pub fn iter(&self) -> serde_json::map::IntoIter {
        self.row.iter()
    }

    pub fn as_row(&self) -> &Row {
        &self.row
    }

    pub fn into_row(self) -> Row {
        self.row
    }
}

impl<E: Entity> Clone for Record<E> {
    fn clone(&self) -> Self {
        Self::wrap(self.row.clone())
    }
}

impl<E: Entity> PartialEq for Record<E> {
    fn eq(&self, other: &Self) -> bool {
        self.row == other.row
    }
}

impl<E: Entity> fmt::Debug for Record<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.row, f)
    }
}

impl<E: Entity> fmt::Display for Record<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.row, f)
    }
}

impl<E: Entity> Serialize for Record<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.row.serialize(serializer)
    }
}

impl<'a, E: Entity> IntoIterator for &'a Record<E> {
    type Item = (String, JsonValue);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E: Entity> From<Record<E>> for Row {
    fn from(record: Record<E>) -> Self {
        record.row
    }
}

/// A record assigned to a relation field.
impl<E: Entity> From<Record<E>> for Value {
    fn from(record: Record<E>) -> Self {
        Value::Relation(Box::new(record.row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{Column, Constraint};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn default_region() -> Value {
        Value::Text("eu".into())
    }

    static OWNERS: Schema = Schema {
        entity: "Owner",
        table_name: "owners",
        fields: &[FieldSpec::new("id", FieldType::Integer), FieldSpec::new("name", FieldType::Text)],
        required: &["name"],
    };

    static ACCOUNTS: Schema = Schema {
        entity: "Account",
        table_name: "accounts",
        fields: &[
            FieldSpec {
                column: Column {
                    primary_key: true,
                    server_default: Some("gen_random_uuid()"),
                    ..Column::PLAIN
                },
                ..FieldSpec::new("id", FieldType::Uuid)
            },
            FieldSpec {
                constraints: &[Constraint::MinLength(3), Constraint::MaxLength(10)],
                ..FieldSpec::new("handle", FieldType::Text)
            },
            FieldSpec {
                constraints: &[Constraint::Ge(Decimal::ZERO)],
                ..FieldSpec::new("balance", FieldType::Decimal)
            },
            FieldSpec {
                default: Some(default_region),
                ..FieldSpec::new("region", FieldType::Text)
            },
            FieldSpec::new("avatar", FieldType::Bytes),
            FieldSpec::new("owner", FieldType::Relation(&OWNERS)),
        ],
        required: &["handle", "region"],
    };

    struct Account;

    impl Entity for Account {
        fn schema() -> &'static Schema {
            &ACCOUNTS
        }
    }

    #[test]
    fn test_dump_only_contains_set_fields() {
        let account = Record::<Account>::new([("handle", "ada".into())]).unwrap();
        assert_eq!(account.dump(), json!({"handle": "ada"}).as_object().unwrap().clone());
        assert!(account.is_set("handle"));
        assert!(!account.is_set("balance"));
    }

    #[test]
    fn test_explicit_null_is_dumped() {
        let account = Record::<Account>::new([("handle", "ada".into()), ("balance", Value::Null)]).unwrap();
        assert_eq!(account.dump().get("balance"), Some(&JsonValue::Null));
    }

    #[test]
    fn test_default_satisfies_required_but_is_not_dumped() {
        let account = Record::<Account>::new([("handle", "ada".into())]).unwrap();
        assert_eq!(account.get("region"), Some(&Value::Text("eu".into())));
        assert!(!account.dump().contains_key("region"));
    }

    #[test]
    fn test_all_violations_reported_together() {
        let err = Record::<Account>::new([("handle", Value::Null), ("balance", Decimal::NEGATIVE_ONE.into())])
            .unwrap_err();
        assert_eq!(err.entity(), "Account");
        assert_eq!(err.violation_for("handle"), Some(&Violation::Required));
        assert_eq!(
            err.violation_for("balance"),
            Some(&Violation::NotGreaterOrEqual { bound: Decimal::ZERO })
        );
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_bad_type_is_not_also_reported_missing() {
        let err = Record::<Account>::new([("handle", Value::Integer(5))]).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert!(matches!(
            err.violation_for("handle"),
            Some(Violation::TypeMismatch { expected: "text", .. })
        ));
    }

    #[test]
    fn test_unknown_field_rejected_on_construct() {
        let err = Record::<Account>::new([("handle", "ada".into()), ("nope", Value::Integer(1))]).unwrap_err();
        assert_eq!(err.violation_for("nope"), Some(&Violation::UnknownField));
    }

    #[test]
    fn test_unknown_field_policy_on_json() {
        let raw = json!({"handle": "ada", "extra": 1});
        let map = raw.as_object().unwrap();
        assert!(Row::from_json(&ACCOUNTS, map, UnknownFields::Ignore).is_ok());
        let err = Row::from_json(&ACCOUNTS, map, UnknownFields::Reject).unwrap_err();
        assert!(err.has_field("extra"));
    }

    #[test]
    fn test_set_marks_field_and_validates() {
        let mut account = Record::<Account>::new([("handle", "ada".into())]).unwrap();
        account.set("avatar", b"ab".as_slice()).unwrap();
        assert_eq!(account.dump().get("avatar"), Some(&json!("YWI=")));

        let err = account.set("handle", "x").unwrap_err();
        assert_eq!(err.violation_for("handle"), Some(&Violation::TooShort { min: 3 }));
        let err = account.set("handle", Value::Null).unwrap_err();
        assert_eq!(err.violation_for("handle"), Some(&Violation::Required));
        assert!(account.set("missing", 1i64).is_err());

        // failed assignments leave the record untouched
        assert_eq!(account.get("handle"), Some(&Value::Text("ada".into())));
    }

    #[test]
    fn test_iterate_matches_dump() {
        let account = Record::<Account>::new([("balance", Value::Integer(3)), ("handle", "ada".into())]).unwrap();
        let pairs: Vec<(String, JsonValue)> = (&account).into_iter().collect();
        assert_eq!(
            pairs,
            vec![("handle".to_string(), json!("ada")), ("balance".to_string(), json!("3"))]
        );
        assert_eq!(pairs.into_iter().collect::<JsonMap>(), account.dump());
    }

    #[test]
    fn test_nested_relation_errors_use_dotted_path() {
        let raw = json!({"handle": "ada", "owner": {"id": 1}});
        let err = Row::from_json(&ACCOUNTS, raw.as_object().unwrap(), UnknownFields::Ignore).unwrap_err();
        assert_eq!(err.violation_for("owner.name"), Some(&Violation::Required));

        let raw = json!({"handle": "ada", "owner": 7});
        let err = Row::from_json(&ACCOUNTS, raw.as_object().unwrap(), UnknownFields::Ignore).unwrap_err();
        assert_eq!(
            err.violation_for("owner"),
            Some(&Violation::NotAMapping { found: "integer" })
        );
    }

    #[test]
    fn test_relation_dumps_nested_object() {
        let owner = Row::new(&OWNERS, [("id", Value::Integer(1)), ("name", "Grace".into())]).unwrap();
        let account = Record::<Account>::new([
            ("handle", "ada".into()),
            ("owner", Value::Relation(Box::new(owner))),
        ])
        .unwrap();
        assert_eq!(
            JsonValue::Object(account.dump()),
            json!({"handle": "ada", "owner": {"id": 1, "name": "Grace"}})
        );
    }

    #[test]
    fn test_relation_rejects_row_of_other_table() {
        let other = Row::new(&ACCOUNTS, [("handle", "ada".into())]).unwrap();
        let err = Record::<Account>::new([("handle", "bob".into()), ("owner", Value::Relation(Box::new(other)))])
            .unwrap_err();
        assert!(err.has_field("owner"));
    }

    #[test]
    fn test_display_lists_every_declared_field() {
        let account = Record::<Account>::new([("handle", "ada".into())]).unwrap();
        assert_eq!(
            account.to_string(),
            "Account(id=None, handle='ada', balance=None, region='eu', avatar=None, owner=None)"
        );
    }

    #[test]
    fn test_from_row_checks_table() {
        let owner = Row::new(&OWNERS, [("name", "Grace".into())]).unwrap();
        assert!(Record::<Account>::from_row(owner).is_err());
        let account = Row::new(&ACCOUNTS, [("handle", "ada".into())]).unwrap();
        assert!(Record::<Account>::from_row(account).is_ok());
    }

    #[test]
    fn test_serialize_matches_dump() {
        let account = Record::<Account>::new([("handle", "ada".into())]).unwrap();
        assert_eq!(serde_json::to_value(&account).unwrap(), json!({"handle": "ada"}));
    }
}
