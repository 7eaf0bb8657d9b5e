//! Two-tier search execution

use super::models::{PrimaryOutcome, SearchRequest, Tier, TieredResults};
use crate::catalog::{DivisionIndex, IndexError};
use crate::geocoder::Geocoder;
use crate::metrics::Metrics;
use crate::results::SearchResult;
use crate::MAX_RESULTS;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failures that escape the tier chain
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Internal search failure: {0}")]
    Internal(String),
}

/// Search orchestrator over the catalog index and the fallback geocoder.
///
/// Stateless between requests apart from the shared handles it holds.
pub struct Search {
    index: Arc<dyn DivisionIndex>,
    geocoder: Arc<dyn Geocoder>,
    metrics: Arc<Metrics>,
}

impl Search {
    /// Create a new search orchestrator
    pub fn new(
        index: Arc<dyn DivisionIndex>,
        geocoder: Arc<dyn Geocoder>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            index,
            geocoder,
            metrics,
        }
    }

    /// Run a search through the tier chain.
    ///
    /// Primary faults hand over to the fallback tier exactly once; if that
    /// fails too the result is empty. Only faults outside the store surface as
    /// errors.
    pub async fn execute(&self, request: &SearchRequest) -> Result<TieredResults, SearchError> {
        self.metrics.inc_search();
        let start = Instant::now();

        match self.run_primary(request).await {
            PrimaryOutcome::Found(records) => {
                let results: Vec<SearchResult> =
                    records.into_iter().map(SearchResult::from).collect();
                self.metrics.record_primary_answer();
                self.metrics
                    .record_response_time(Tier::Primary.as_str(), start.elapsed().as_millis() as u64);
                info!(
                    "Found {} results for '{}' from the catalog",
                    results.len(),
                    request.query
                );
                Ok(TieredResults::new(Tier::Primary, results))
            }
            PrimaryOutcome::NeedsFallback(reason) => {
                warn!("Catalog search failed for '{}': {}", request.query, reason);
                self.metrics.record_primary_failure();
                Ok(self.run_fallback(request).await)
            }
            PrimaryOutcome::Failed(reason) => {
                error!("Search for '{}' failed internally: {}", request.query, reason);
                self.metrics.record_internal_error();
                Err(SearchError::Internal(reason))
            }
        }
    }

    /// Query the catalog on the blocking pool and tag the outcome
    pub async fn run_primary(&self, request: &SearchRequest) -> PrimaryOutcome {
        if let Some(reason) = &request.input_fault {
            return PrimaryOutcome::NeedsFallback(IndexError::InvalidQuery(reason.clone()));
        }

        let query = request.catalog_query();
        if query.is_empty() {
            debug!("No place kinds selected for '{}'", request.query);
            return PrimaryOutcome::Found(Vec::new());
        }

        let index = self.index.clone();
        let catalog_query = query.clone();
        match tokio::task::spawn_blocking(move || index.search(&catalog_query)).await {
            Ok(Ok(mut records)) => {
                records.retain(|record| query.admits(record));
                records.truncate(MAX_RESULTS);
                PrimaryOutcome::Found(records)
            }
            Ok(Err(e)) => PrimaryOutcome::NeedsFallback(e),
            Err(join_error) => PrimaryOutcome::Failed(format!("catalog task failed: {}", join_error)),
        }
    }

    async fn run_fallback(&self, request: &SearchRequest) -> TieredResults {
        let start = Instant::now();
        match self.geocoder.search(&request.query, &request.filters).await {
            Ok(mut results) => {
                results.truncate(MAX_RESULTS);
                self.metrics.record_fallback_answer();
                self.metrics
                    .record_response_time(Tier::Fallback.as_str(), start.elapsed().as_millis() as u64);
                info!(
                    "Found {} results for '{}' from {} fallback",
                    results.len(),
                    request.query,
                    self.geocoder.name()
                );
                TieredResults::new(Tier::Fallback, results)
            }
            Err(e) => {
                error!(
                    "{} fallback also failed for '{}': {}",
                    self.geocoder.name(),
                    request.query,
                    e
                );
                self.metrics.record_fallback_failure();
                TieredResults::new(Tier::Exhausted, Vec::new())
            }
        }
    }
}
