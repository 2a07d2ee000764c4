//! End-to-end scenarios across schemas, records, loading and dumping.

use chrono::{NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    Category, Entity, FieldType, FieldViolation, LoadOptions, Loaded, Payload, Product, ProductStatus, Record,
    Response, Row, UnknownFields, Value, Violation,
    db::{
        models,
        schema::{FieldSpec, Schema},
    },
};

static READINGS: Schema = Schema {
    entity: "Reading",
    table_name: "readings",
    fields: &[
        FieldSpec::new("id", FieldType::Uuid),
        FieldSpec::new("taken_on", FieldType::Date),
        FieldSpec::new("taken_at", FieldType::Time),
        FieldSpec::new("recorded", FieldType::Timestamp),
        FieldSpec::new("delta", FieldType::Decimal),
        FieldSpec::new("raw", FieldType::Bytes),
        FieldSpec::new("checksum", FieldType::Bytes),
    ],
    required: &["id"],
};

struct Reading;

impl Entity for Reading {
    fn schema() -> &'static Schema {
        &READINGS
    }
}

fn full_product() -> Record<Product> {
    let category = Record::<Category>::new([
        ("id", 3i64.into()),
        ("name", "Tools".into()),
        ("nickname", "tool".into()),
    ])
    .unwrap();

    Record::<Product>::new([
        ("id", 11i64.into()),
        ("name", "Widget".into()),
        ("sku", "ABC-1234".into()),
        ("price", Decimal::from_str("10.99").unwrap().into()),
        ("category_id", 3i64.into()),
        ("status", ProductStatus::Archived.into()),
        ("created_at", Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap().into()),
        ("categories", category.into()),
    ])
    .unwrap()
}

#[test_log::test]
fn test_load_of_dump_reproduces_record() {
    let product = full_product();
    let dumped = product.dump();
    assert_eq!(
        serde_json::Value::Object(dumped.clone()),
        json!({
            "id": 11,
            "name": "Widget",
            "sku": "ABC-1234",
            "price": "10.99",
            "category_id": 3,
            "status": "archived",
            "created_at": "2024-05-01T12:30:00+00:00",
            "categories": {"id": 3, "name": "Tools", "nickname": "tool"}
        })
    );

    let reloaded = Record::<Product>::load_one(dumped).unwrap();
    assert_eq!(reloaded, product);
    assert_eq!(reloaded.dump(), product.dump());
}

#[test_log::test]
fn test_round_trip_keeps_unset_fields_unset() {
    let product = Record::<Product>::new([("name", "Widget".into()), ("sku", "AB-123".into())]).unwrap();
    let reloaded = Record::<Product>::load_one(product.dump()).unwrap();
    assert_eq!(reloaded.fields_set().collect::<Vec<_>>(), vec!["name", "sku"]);
    assert_eq!(reloaded.get("price"), Some(&Value::Null));
}

#[test_log::test]
fn test_envelope_of_rows_loads_in_order() {
    let response = Response {
        data: json!([
            {"id": 1, "name": "A", "sku": "AA-001"},
            {"id": 2, "name": "B", "sku": "BB-002"},
            {"id": 3, "name": "C", "sku": "CC-003"},
        ]),
        count: Some(3),
    };
    let products = Record::<Product>::load(response).unwrap();
    assert!(products.is_many());
    let skus: Vec<_> = products
        .into_vec()
        .iter()
        .map(|p| p.sku().unwrap_or_default().to_string())
        .collect();
    assert_eq!(skus, vec!["AA-001", "BB-002", "CC-003"]);
}

#[test_log::test]
fn test_envelope_of_one_mapping_is_not_a_sequence() {
    let loaded = Record::<Category>::load(Response::new(json!({"id": 1, "name": "Tools"}))).unwrap();
    match loaded {
        Loaded::One(category) => assert_eq!(category.name(), Some("Tools")),
        Loaded::Many(_) => panic!("expected a single record"),
    }
}

#[test_log::test]
fn test_invalid_row_in_envelope_reports_every_violation() {
    let payload = Payload::Envelope(Response::new(json!([
        {"name": "A", "sku": "AA-001"},
        {"sku": "AB-12", "price": 0.5},
    ])));
    let err = Record::<Product>::load(payload).unwrap_err();

    assert_eq!(err.entity(), "Product");
    assert_eq!(err.row(), Some(1));
    assert_eq!(
        err.violations(),
        &[
            FieldViolation::new(
                "sku",
                Violation::PatternMismatch {
                    pattern: "^[A-Z]{2,3}-[0-9]{3,4}$"
                }
            ),
            FieldViolation::new("price", Violation::NotGreaterThan { bound: Decimal::ONE }),
            FieldViolation::new("name", Violation::Required),
        ]
    );
    assert!(err.to_string().starts_with("3 validation errors for Product (row 1): "));
}

#[test_log::test]
fn test_nested_category_errors_are_prefixed() {
    let err = Record::<Product>::load_one(json!({
        "name": "Widget",
        "sku": "AB-123",
        "categories": {"id": 1, "nickname": "abc"}
    }))
    .unwrap_err();
    assert_eq!(err.violation_for("categories.nickname"), Some(&Violation::TooShort { min: 4 }));
    assert_eq!(err.violation_for("categories.name"), Some(&Violation::Required));
}

#[test_log::test]
fn test_reject_unknown_columns_when_configured() {
    let raw = json!({"name": "Tools", "slug": "tools"});
    assert!(Record::<Category>::load(raw.clone()).is_ok());

    let options = LoadOptions {
        unknown_fields: UnknownFields::Reject,
    };
    let err = Record::<Category>::load_with(raw, &options).unwrap_err();
    assert_eq!(err.violation_for("slug"), Some(&Violation::UnknownField));
}

#[test_log::test]
fn test_untyped_rows_for_runtime_table() {
    let schema = models::schema_for_table("categories").unwrap();
    let rows = Row::load(schema, json!([{"name": "A"}, {"name": "B"}]), &LoadOptions::default())
        .unwrap()
        .into_vec();
    assert_eq!(rows.len(), 2);

    let category = Record::<Category>::from_row(rows[1].clone()).unwrap();
    assert_eq!(category.name(), Some("B"));
    assert!(Record::<Product>::from_row(rows[0].clone()).is_err());
}

#[test_log::test]
fn test_text_representation_shows_all_fields() {
    let category = Record::<Category>::new([("name", "Tools".into())]).unwrap();
    assert_eq!(category.to_string(), "Category(id=None, name='Tools', nickname=None)");

    let product = full_product();
    assert_eq!(
        product.to_string(),
        "Product(id=11, name='Widget', sku='ABC-1234', price=Decimal('10.99'), category_id=3, \
         status='archived', created_at=2024-05-01T12:30:00+00:00, \
         categories=Category(id=3, name='Tools', nickname='tool'))"
    );
}

#[test_log::test]
fn test_assignment_after_construction_is_dumped() {
    let mut product = Record::<Product>::new([("name", "Widget".into()), ("sku", "AB-123".into())]).unwrap();
    product.set("status", ProductStatus::Active).unwrap();
    product.set("price", 12i64).unwrap();
    assert_eq!(
        serde_json::Value::Object(product.dump()),
        json!({"name": "Widget", "sku": "AB-123", "price": "12", "status": "active"})
    );
    assert!(product.set("price", 1i64).is_err());
}

#[test_log::test]
fn test_load_of_dump_reproduces_temporal_uuid_and_bytes_values() {
    let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
    let reading = Record::<Reading>::new([
        ("id", id.into()),
        ("taken_on", NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().into()),
        ("taken_at", NaiveTime::from_hms_nano_opt(1, 2, 3, 4).unwrap().into()),
        (
            "recorded",
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap().with_nanosecond(7).unwrap().into(),
        ),
        ("delta", Decimal::from_str("-0.000000001").unwrap().into()),
        ("raw", Vec::<u8>::new().into()),
        ("checksum", b"ab".as_slice().into()),
    ])
    .unwrap();

    let dumped = reading.dump();
    assert_eq!(
        serde_json::Value::Object(dumped.clone()),
        json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "taken_on": "2024-02-29",
            "taken_at": "01:02:03.000000004",
            "recorded": "2024-05-01T12:00:00.000000007+00:00",
            "delta": "-0.000000001",
            "raw": "",
            "checksum": "YWI="
        })
    );

    let reloaded = Record::<Reading>::load_one(dumped).unwrap();
    assert_eq!(reloaded, reading);
    assert_eq!(reloaded.get("raw"), Some(&Value::Bytes(Vec::new())));
}

#[test_log::test]
fn test_load_of_dump_keeps_wide_decimals() {
    let raw: serde_json::Value =
        serde_json::from_str(r#"{"name": "W", "sku": "AB-123", "price": 12.345678901234567890123}"#).unwrap();
    let product = Record::<Product>::load_one(raw).unwrap();
    assert_eq!(product.price(), Some(Decimal::from_str("12.345678901234567890123").unwrap()));
    assert_eq!(product.dump().get("price"), Some(&json!("12.345678901234567890123")));

    let reloaded = Record::<Product>::load_one(product.dump()).unwrap();
    assert_eq!(reloaded, product);
}

#[test_log::test]
fn test_load_many_accepts_mapping_and_sequence() {
    let one = Record::<Category>::load_many(json!({"name": "Tools"})).unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].name(), Some("Tools"));

    let many = Record::<Category>::load_many(Response::new(json!([{"name": "A"}, {"name": "B"}]))).unwrap();
    let names: Vec<_> = many.iter().map(|c| c.name()).collect();
    assert_eq!(names, vec![Some("A"), Some("B")]);

    assert!(Record::<Category>::load_many(json!([])).unwrap().is_empty());
    let err = Record::<Category>::load_many(json!([{"name": "A"}, {"nickname": "tool"}])).unwrap_err();
    assert_eq!(err.row(), Some(1));
}
