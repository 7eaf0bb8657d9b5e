//! Fallback geocoding
//!
//! Adapters for external geocoding providers used when the catalog tier
//! cannot answer. Provider responses are normalized into [`SearchResult`].
//!
//! [`SearchResult`]: crate::results::SearchResult

mod nominatim;
mod traits;

pub use nominatim::{admits, classify, Nominatim};
pub use traits::*;
