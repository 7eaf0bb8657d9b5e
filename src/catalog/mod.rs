//! Lightweight division catalog
//!
//! Read-only lookup over pre-built division records with text, subtype and
//! viewport filtering. Geometry is not stored here; see [`crate::geometry`].

mod builder;
mod models;
mod query;
mod store;

pub use builder::IndexBuilder;
pub use models::*;
pub use query::{CatalogQuery, INDEX_TABLE};
pub use store::{DivisionIndex, IndexError, IndexStatus, SqliteIndex};
