//! Search result types
//!
//! Defines the uniform result shape returned by both search tiers.

mod types;

pub use types::*;
