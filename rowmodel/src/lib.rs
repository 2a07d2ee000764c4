//! # rowmodel: typed records over backend table rows
//!
//! `rowmodel` is a thin data-access layer for a relational backend reached through an
//! external client. Each table is described once by a static schema (columns, semantic
//! types, constraints and required fields) and rows move through it in both directions:
//!
//! - **load**: raw rows or response envelopes returned by the client become validated
//!   records ([`Record::load`])
//! - **dump**: records become JSON-safe mappings of the fields the caller actually set,
//!   ready to hand to the client for an insert or update ([`Record::dump`])
//!
//! No queries are built and no I/O happens here. Connections, transactions and migrations
//! belong to the client.
//!
//! ## Records
//!
//! A [`Record<E>`] is validated as a whole when it is constructed: all fields are assigned,
//! defaults resolved, constraints checked, and finally every required field that is still
//! null is listed. All problems are reported together in one [`ValidationError`].
//!
//! ```ignore
//! use rowmodel::{Product, Record};
//!
//! let product = Record::<Product>::new([
//!     ("name", "Widget".into()),
//!     ("sku", "AB-123".into()),
//!     ("price", "10.99".parse::<rust_decimal::Decimal>()?.into()),
//! ])?;
//! assert_eq!(product.dump()["price"], "10.99");
//! ```
//!
//! ## Tables
//!
//! The shipped tables live in [`db::models`]: [`Category`] (`categories`) and [`Product`]
//! (`products`). Adding a table means declaring its schema and registering it in
//! [`db::models::ENTITIES`].
//!
//! ## Binary
//!
//! The `rowmodel` binary loads a payload file through a table schema, reporting validation
//! errors or printing the normalized dumps. See [`config`] for its options.

pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test;

pub use config::Config;
pub use db::load::{LoadOptions, Loaded, Payload, Response, UnknownFields};
pub use db::models::{Category, Product, ProductStatus};
pub use db::record::{Entity, Record, Row};
pub use errors::{FieldViolation, ValidationError, Violation};
pub use types::{FieldType, Value, ValueKind};
