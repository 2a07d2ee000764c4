use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error as ThisError;

/// The single error kind raised when a record cannot be built.
///
/// One error carries every violation found while constructing a record, so a caller sees
/// all missing required fields (and any other broken field) at once. When a sequence of
/// rows is loaded, `row` holds the index of the row that failed.
#[derive(ThisError, Debug, Clone, PartialEq)]
#[error("{} for {entity}{}: {}", count_label(.violations.len()), row_label(.row), join(.violations))]
pub struct ValidationError {
    entity: &'static str,
    row: Option<usize>,
    violations: Vec<FieldViolation>,
}

/// A violated constraint on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// Field name, dotted for nested relations (`categories.name`). Empty when the row
    /// itself is malformed.
    pub field: String,
    pub violation: Violation,
}

/// What went wrong with a field. These describe a [`ValidationError`]; they are not
/// separate error types.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Required field is null after defaults were resolved
    Required,
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    TooShort {
        min: usize,
    },
    TooLong {
        max: usize,
    },
    PatternMismatch {
        pattern: &'static str,
    },
    NotGreaterThan {
        bound: Decimal,
    },
    NotGreaterOrEqual {
        bound: Decimal,
    },
    InvalidVariant {
        allowed: &'static [&'static str],
    },
    /// Value has the right JSON type but its text does not parse
    InvalidFormat {
        expected: &'static str,
        reason: String,
    },
    UnknownField,
    NotAMapping {
        found: &'static str,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Required => write!(f, "field required"),
            Violation::TypeMismatch { expected, found } => write!(f, "expected {expected}, found {found}"),
            Violation::TooShort { min } => write!(f, "should have at least {min} characters"),
            Violation::TooLong { max } => write!(f, "should have at most {max} characters"),
            Violation::PatternMismatch { pattern } => write!(f, "should match pattern '{pattern}'"),
            Violation::NotGreaterThan { bound } => write!(f, "should be greater than {bound}"),
            Violation::NotGreaterOrEqual { bound } => write!(f, "should be greater than or equal to {bound}"),
            Violation::InvalidVariant { allowed } => write!(f, "should be one of: {}", allowed.join(", ")),
            Violation::InvalidFormat { expected, reason } => write!(f, "invalid {expected}: {reason}"),
            Violation::UnknownField => write!(f, "unknown field"),
            Violation::NotAMapping { found } => write!(f, "expected a mapping of fields to values, found {found}"),
        }
    }
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, violation: Violation) -> Self {
        Self {
            field: field.into(),
            violation,
        }
    }

    /// Prefix the field path with the name of the relation it was found under.
    pub(crate) fn nested_under(mut self, relation: &str) -> Self {
        self.field = if self.field.is_empty() {
            relation.to_string()
        } else {
            format!("{relation}.{}", self.field)
        };
        self
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.violation)
        } else {
            write!(f, "{}: {}", self.field, self.violation)
        }
    }
}

impl ValidationError {
    pub fn new(entity: &'static str, violations: Vec<FieldViolation>) -> Self {
        Self {
            entity,
            row: None,
            violations,
        }
    }

    /// Attach the index of the failing row within a loaded sequence.
    pub(crate) fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Name of the entity that failed validation (e.g. `Product`)
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn row(&self) -> Option<usize> {
        self.row
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<FieldViolation> {
        self.violations
    }

    /// Names of the offending fields, in the order they were found.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|v| v.field.as_str())
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields().any(|f| f == field)
    }

    /// First violation recorded for `field`, if any.
    pub fn violation_for(&self, field: &str) -> Option<&Violation> {
        self.violations.iter().find(|v| v.field == field).map(|v| &v.violation)
    }

    /// Fields reported as required but null.
    pub fn missing_fields(&self) -> Vec<&str> {
        self.violations
            .iter()
            .filter(|v| v.violation == Violation::Required)
            .map(|v| v.field.as_str())
            .collect()
    }
}

fn count_label(n: usize) -> String {
    if n == 1 {
        "1 validation error".to_string()
    } else {
        format!("{n} validation errors")
    }
}

fn row_label(row: &Option<usize>) -> String {
    row.map(|i| format!(" (row {i})")).unwrap_or_default()
}

fn join(violations: &[FieldViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Type alias for record operation results
pub type Result<T> = std::result::Result<T, ValidationError>;
