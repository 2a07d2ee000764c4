//! Model for the `categories` table.

use crate::db::record::{Entity, Record};
use crate::db::schema::{Column, Constraint, FieldSpec, Schema};
use crate::types::FieldType;

/// Marker for rows of the `categories` table.
#[derive(Debug, Clone, Copy)]
pub struct Category;

pub static SCHEMA: Schema = Schema {
    entity: "Category",
    table_name: "categories",
    fields: &[
        FieldSpec {
            column: Column {
                primary_key: true,
                server_default: Some("nextval('categories_id_seq')"),
                ..Column::PLAIN
            },
            ..FieldSpec::new("id", FieldType::Integer)
        },
        FieldSpec {
            constraints: &[Constraint::MaxLength(100)],
            ..FieldSpec::new("name", FieldType::Text)
        },
        FieldSpec {
            constraints: &[Constraint::MinLength(4), Constraint::MaxLength(14)],
            column: Column {
                check: Some("char_length(nickname) > 3 AND char_length(nickname) < 15"),
                ..Column::PLAIN
            },
            ..FieldSpec::new("nickname", FieldType::Text)
        },
    ],
    required: &["name"],
};

impl Entity for Category {
    fn schema() -> &'static Schema {
        &SCHEMA
    }
}

impl Record<Category> {
    pub fn id(&self) -> Option<i64> {
        self.as_row().integer("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.as_row().text("name")
    }

    pub fn nickname(&self) -> Option<&str> {
        self.as_row().text("nickname")
    }
}
