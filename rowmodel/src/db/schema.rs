//! Table schemas: the fixed contract each entity declares.
//!
//! A [`Schema`] is declared once per table as a `static` and never changes at runtime. It
//! names the table, lists the fields in column order with their semantic type, client-side
//! constraints and column metadata, and lists which fields are required.
//!
//! Column metadata (primary key, uniqueness, foreign keys, server defaults and CHECK
//! expressions) is descriptive only. The backend enforces it; records carry it so callers
//! and tooling can tell, for example, that an omitted `created_at` will be filled with
//! `now()` on insert.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::db::serializers;
use crate::errors::Violation;
use crate::types::{FieldType, Value};

/// Schema of one table.
#[derive(Debug)]
pub struct Schema {
    /// Rust-facing entity name, used in error messages and text representations
    pub entity: &'static str,
    pub table_name: &'static str,
    /// Fields in column order
    pub fields: &'static [FieldSpec],
    /// Fields that must be non-null once a record is constructed
    pub required: &'static [&'static str],
}

/// A single field (column) of a table.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Client-side default, resolved before validation. Defaulted fields are not dumped.
    pub default: Option<fn() -> Value>,
    pub constraints: &'static [Constraint],
    pub column: Column,
}

/// Descriptive column metadata mirrored from the database.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub primary_key: bool,
    pub unique: bool,
    pub foreign_key: Option<ForeignKey>,
    /// SQL default applied by the backend when the column is omitted
    pub server_default: Option<&'static str>,
    /// CHECK constraint expression as declared in the database
    pub check: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

/// Client-side constraint checked on every non-null value.
#[derive(Debug)]
pub enum Constraint {
    MinLength(usize),
    MaxLength(usize),
    Pattern(&'static Lazy<Regex>),
    /// Exclusive numeric lower bound
    Gt(Decimal),
    /// Inclusive numeric lower bound
    Ge(Decimal),
}

impl Column {
    pub const PLAIN: Column = Column {
        primary_key: false,
        unique: false,
        foreign_key: None,
        server_default: None,
        check: None,
    };
}

impl FieldSpec {
    /// A nullable field with no default, constraints or column metadata.
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            default: None,
            constraints: &[],
            column: Column::PLAIN,
        }
    }

    /// Run every declared constraint, collecting all that fail.
    pub fn check(&self, value: &Value) -> Vec<Violation> {
        if value.is_null() {
            return Vec::new();
        }
        self.constraints.iter().filter_map(|c| c.check(value).err()).collect()
    }
}

impl Constraint {
    /// Check one value. Length and pattern constraints apply to text, bounds to numbers;
    /// other value kinds pass.
    pub fn check(&self, value: &Value) -> Result<(), Violation> {
        match self {
            Constraint::MinLength(min) => match value.as_str() {
                Some(s) if s.chars().count() < *min => Err(Violation::TooShort { min: *min }),
                _ => Ok(()),
            },
            Constraint::MaxLength(max) => match value.as_str() {
                Some(s) if s.chars().count() > *max => Err(Violation::TooLong { max: *max }),
                _ => Ok(()),
            },
            Constraint::Pattern(lazy) => {
                let regex: &'static Regex = Lazy::force(*lazy);
                match value.as_str() {
                    Some(s) if !regex.is_match(s) => Err(Violation::PatternMismatch {
                        pattern: regex.as_str(),
                    }),
                    _ => Ok(()),
                }
            }
            Constraint::Gt(bound) => match value.numeric() {
                Some(n) if n <= *bound => Err(Violation::NotGreaterThan { bound: *bound }),
                _ => Ok(()),
            },
            Constraint::Ge(bound) => match value.numeric() {
                Some(n) if n < *bound => Err(Violation::NotGreaterOrEqual { bound: *bound }),
                _ => Ok(()),
            },
        }
    }
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(&name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|f| f.name)
    }

    pub fn primary_key(&self) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.column.primary_key)
    }

    /// Fields that hold an expanded related row rather than a column value.
    pub fn relations(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| matches!(f.ty, FieldType::Relation(_)))
    }

    /// Check the schema is internally consistent: unique field names, every required name
    /// declared, and a serializer registered for every field's value kind.
    pub fn verify(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for field in self.fields {
            if !seen.insert(field.name) {
                anyhow::bail!("{}: field '{}' is declared twice", self.table_name, field.name);
            }
            if serializers::serializer_for(field.ty.kind()).is_none() {
                anyhow::bail!(
                    "{}: no serializer registered for field '{}' of kind {}",
                    self.table_name,
                    field.name,
                    field.ty.kind()
                );
            }
        }
        for name in self.required {
            if !seen.contains(name) {
                anyhow::bail!("{}: required field '{}' is not declared", self.table_name, name);
            }
        }
        Ok(())
    }
}
