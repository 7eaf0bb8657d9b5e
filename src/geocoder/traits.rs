//! Geocoder traits and request/response types

use crate::catalog::FilterSet;
use crate::results::SearchResult;
use async_trait::async_trait;
use thiserror::Error;

/// Failures of the fallback tier
#[derive(Debug, Error)]
pub enum GeocoderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned HTTP {0}")]
    Status(u16),

    #[error("Failed to parse provider response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provider request timed out")]
    Timeout,
}

/// HTTP request to be made to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    /// URL to request
    pub url: String,
    /// Query parameters, in send order
    pub params: Vec<(String, String)>,
}

impl ProviderRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
        }
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Look up a parameter value
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP response from a provider request
#[derive(Debug)]
pub struct ProviderResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub text: String,
}

impl ProviderResponse {
    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// External geocoding provider queried by the fallback tier
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Free-text search, already normalized into the catalog result shape.
    ///
    /// Results keep the provider's order.
    async fn search(
        &self,
        query: &str,
        filters: &FilterSet,
    ) -> Result<Vec<SearchResult>, GeocoderError>;
}
