//! Search orchestration module
//!
//! Runs the catalog tier and, when it cannot answer, the fallback geocoder.

mod executor;
mod models;

pub use executor::{Search, SearchError};
pub use models::*;
