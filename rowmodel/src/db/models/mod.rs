//! Entity definitions, one module per table.
//!
//! Each module declares a `static` [`Schema`] mirroring its table's columns, types and
//! constraints, a marker type implementing [`Entity`](crate::db::record::Entity), and typed
//! accessors on `Record<Marker>`.
//!
//! # Tables
//!
//! - [`categories`]: product categories
//! - [`products`]: the product catalogue; references `categories` by `category_id` and can
//!   carry the expanded category under `categories`
//!
//! Every schema is listed in [`ENTITIES`] so tooling can pick a table at runtime, and
//! [`verify_schemas`] checks the whole set once at start-up.
//!
//! # Example
//!
//! ```ignore
//! use rowmodel::{Product, Record};
//!
//! let products = Record::<Product>::load_many(response)?;
//! for product in &products {
//!     println!("{} costs {:?}", product.sku().unwrap_or_default(), product.price());
//! }
//! ```

pub mod categories;
pub mod products;

pub use categories::Category;
pub use products::{Product, ProductStatus};

use crate::db::schema::Schema;
use crate::types::FieldType;

/// Every registered table schema.
pub static ENTITIES: &[&Schema] = &[&categories::SCHEMA, &products::SCHEMA];

pub fn schema_for_table(table_name: &str) -> Option<&'static Schema> {
    ENTITIES.iter().copied().find(|s| s.table_name == table_name)
}

/// Check every registered schema, and that relations and foreign keys point at registered
/// tables and columns.
pub fn verify_schemas() -> anyhow::Result<()> {
    verify(ENTITIES)
}

fn verify(schemas: &[&'static Schema]) -> anyhow::Result<()> {
    for schema in schemas {
        schema.verify()?;

        for field in schema.fields {
            if let FieldType::Relation(target) = field.ty
                && !schemas.iter().any(|s| s.table_name == target.table_name)
            {
                anyhow::bail!(
                    "{}: relation '{}' points at unregistered table '{}'",
                    schema.table_name,
                    field.name,
                    target.table_name
                );
            }

            if let Some(fk) = field.column.foreign_key {
                let target = schemas
                    .iter()
                    .find(|s| s.table_name == fk.table)
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "{}: foreign key '{}' references unregistered table '{}'",
                            schema.table_name,
                            field.name,
                            fk.table
                        )
                    })?;
                if target.field(fk.column).is_none() {
                    anyhow::bail!(
                        "{}: foreign key '{}' references missing column {}.{}",
                        schema.table_name,
                        field.name,
                        fk.table,
                        fk.column
                    );
                }
            }
        }
    }
    Ok(())
}
