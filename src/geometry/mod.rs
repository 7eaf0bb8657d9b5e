//! Boundary geometry resolution
//!
//! Fetches native geometry for one division from the raw dataset snapshot,
//! simplifies it, and substitutes a whole-world sentinel when nothing usable
//! comes back.

mod resolver;
mod simplify;

pub use resolver::{
    sentinel_geometry, GeometryError, GeometryResolver, GeometrySource, Resolution,
    SqliteGeometrySource, GEOMETRY_TABLE, SIMPLIFY_TOLERANCE,
};
pub use simplify::simplify_geometry;
