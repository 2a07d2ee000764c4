//! Data-access layer over the backend's tables.
//!
//! Nothing here talks to the database. The backend client performs the I/O; this module
//! shapes rows on the way in and out.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   Client    │  (backend client: select / insert / update)
//! └──────┬──────┘
//!        │  raw rows, response envelopes   ↑ dump()
//!        ↓                                 │
//! ┌─────────────┐
//! │   Records   │  (db::record, db::load - validation, load, dump)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - per-table schemas)
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`schema`]: schema declarations, constraints and column metadata
//! - [`serializers`]: the kind-to-JSON serializer table used by dumps
//! - [`record`]: the [`Entity`] trait, untyped [`Row`] and typed [`Record`]
//! - [`load`]: response envelopes and loading of one or many rows
//! - [`models`]: the table definitions

pub mod load;
pub mod models;
pub mod record;
pub mod schema;
pub mod serializers;

pub use load::{LoadOptions, Loaded, Payload, Response, UnknownFields};
pub use record::{Entity, JsonMap, Record, Row};
pub use schema::{Column, Constraint, FieldSpec, ForeignKey, Schema};
