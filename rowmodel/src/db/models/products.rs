//! Model for the `products` table.
//!
//! `category_id` is the foreign key to `categories.id`. The expanded `categories` relation
//! is only present when the query selected `categories(*)` alongside the product columns.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::categories::{self, Category};
use crate::db::record::{Entity, Record};
use crate::db::schema::{Column, Constraint, FieldSpec, ForeignKey, Schema};
use crate::errors::Violation;
use crate::types::{FieldType, Value};

static SKU_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2,3}-[0-9]{3,4}$").expect("SKU pattern is valid"));

/// Values of the `product_status` enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

impl ProductStatus {
    pub const VARIANTS: &'static [&'static str] = &["draft", "active", "archived"];

    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = Violation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProductStatus::Draft),
            "active" => Ok(ProductStatus::Active),
            "archived" => Ok(ProductStatus::Archived),
            _ => Err(Violation::InvalidVariant {
                allowed: Self::VARIANTS,
            }),
        }
    }
}

impl From<ProductStatus> for Value {
    fn from(status: ProductStatus) -> Self {
        Value::Text(status.as_str().to_string())
    }
}

/// Marker for rows of the `products` table.
#[derive(Debug, Clone, Copy)]
pub struct Product;

pub static SCHEMA: Schema = Schema {
    entity: "Product",
    table_name: "products",
    fields: &[
        FieldSpec {
            column: Column {
                primary_key: true,
                server_default: Some("nextval('products_id_seq')"),
                ..Column::PLAIN
            },
            ..FieldSpec::new("id", FieldType::Integer)
        },
        FieldSpec {
            constraints: &[Constraint::MaxLength(100)],
            column: Column {
                check: Some("length(name) < 102"),
                ..Column::PLAIN
            },
            ..FieldSpec::new("name", FieldType::Text)
        },
        FieldSpec {
            constraints: &[Constraint::MaxLength(20), Constraint::Pattern(&SKU_PATTERN)],
            column: Column {
                unique: true,
                check: Some("sku ~ '^[A-Z]{2,3}-[0-9]{3,4}$'"),
                ..Column::PLAIN
            },
            ..FieldSpec::new("sku", FieldType::Text)
        },
        FieldSpec {
            constraints: &[Constraint::Gt(Decimal::ONE)],
            column: Column {
                server_default: Some("'9'"),
                check: Some("price > 1"),
                ..Column::PLAIN
            },
            ..FieldSpec::new("price", FieldType::Decimal)
        },
        FieldSpec {
            column: Column {
                foreign_key: Some(ForeignKey {
                    table: "categories",
                    column: "id",
                }),
                ..Column::PLAIN
            },
            ..FieldSpec::new("category_id", FieldType::Integer)
        },
        FieldSpec {
            constraints: &[Constraint::MaxLength(8)],
            column: Column {
                server_default: Some("'draft'"),
                ..Column::PLAIN
            },
            ..FieldSpec::new("status", FieldType::Enum(ProductStatus::VARIANTS))
        },
        FieldSpec {
            column: Column {
                server_default: Some("now()"),
                ..Column::PLAIN
            },
            ..FieldSpec::new("created_at", FieldType::Timestamp)
        },
        FieldSpec::new("categories", FieldType::Relation(&categories::SCHEMA)),
    ],
    required: &["name", "sku"],
};

impl Entity for Product {
    fn schema() -> &'static Schema {
        &SCHEMA
    }
}

impl Record<Product> {
    pub fn id(&self) -> Option<i64> {
        self.as_row().integer("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.as_row().text("name")
    }

    pub fn sku(&self) -> Option<&str> {
        self.as_row().text("sku")
    }

    pub fn price(&self) -> Option<Decimal> {
        self.as_row().decimal("price")
    }

    pub fn category_id(&self) -> Option<i64> {
        self.as_row().integer("category_id")
    }

    pub fn status(&self) -> Option<ProductStatus> {
        self.as_row().text("status").and_then(|s| s.parse().ok())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.as_row().timestamp("created_at")
    }

    /// The expanded category, when it was selected with the product.
    pub fn categories(&self) -> Option<Record<Category>> {
        self.as_row().relation("categories").cloned().map(Record::wrap)
    }
}
