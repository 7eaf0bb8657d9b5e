//! HTTP client for requests to the fallback provider

use crate::config::{FallbackSettings, OutgoingSettings};
use crate::geocoder::{GeocoderError, ProviderRequest, ProviderResponse};
use crate::FALLBACK_TIMEOUT;
use anyhow::Result;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// HTTP client wrapper with an identifying User-Agent and fixed timeout
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
    user_agent: String,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        Self::with_settings(&OutgoingSettings::default(), &FallbackSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(outgoing: &OutgoingSettings, fallback: &FallbackSettings) -> Result<Self> {
        let timeout = Duration::from_secs(FALLBACK_TIMEOUT);
        let mut builder = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(outgoing.pool_maxsize)
            .gzip(true)
            .brotli(true);

        // SSL verification
        if !outgoing.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        // Proxy settings
        if let Some(ref proxy_url) = outgoing.proxies.all {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        } else {
            if let Some(ref http) = outgoing.proxies.http {
                builder = builder.proxy(reqwest::Proxy::http(http)?);
            }
            if let Some(ref https) = outgoing.proxies.https {
                builder = builder.proxy(reqwest::Proxy::https(https)?);
            }
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            timeout,
            user_agent: fallback.user_agent.clone(),
        })
    }

    /// Execute a provider request. Single attempt, no retries.
    pub async fn execute(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, GeocoderError> {
        debug!("GET {} ({} params)", request.url, request.params.len());

        let response = self
            .client
            .get(&request.url)
            .timeout(self.timeout)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json,application/geo+json;q=0.9,*/*;q=0.1")
            .query(&request.params)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(classify)?;

        Ok(ProviderResponse { status, text })
    }

    /// Get current user agent
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Timeout applied to every request
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn classify(error: reqwest::Error) -> GeocoderError {
    if error.is_timeout() {
        GeocoderError::Timeout
    } else {
        GeocoderError::Network(error)
    }
}
