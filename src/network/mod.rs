//! HTTP networking module
//!
//! Provides the outbound client used by the fallback geocoder.

mod client;

pub use client::HttpClient;
