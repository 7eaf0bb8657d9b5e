//! Division Search: place-name lookup over administrative boundary records
//!
//! Answers free-text queries against a pre-built catalog of division records,
//! resolves boundary geometry on demand, and falls back to an external
//! geocoder when the catalog cannot be queried.

pub mod catalog;
pub mod config;
pub mod geocoder;
pub mod geometry;
pub mod metrics;
pub mod network;
pub mod results;
pub mod search;
pub mod web;

pub use catalog::{DivisionIndex, DivisionRecord, FilterSet, QueryBBox};
pub use config::Settings;
pub use geocoder::Geocoder;
pub use geometry::GeometryResolver;
pub use results::{ResultType, SearchResult};
pub use search::{Search, SearchRequest};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "overture-maps-viewer";

/// Hard cap on records returned by a single catalog search
pub const MAX_RESULTS: usize = 20;

/// Timeout for the fallback geocoder in seconds
pub const FALLBACK_TIMEOUT: u64 = 10;
