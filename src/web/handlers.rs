//! HTTP request handlers

use super::error::ApiError;
use super::state::AppState;
use crate::catalog::{FilterSet, QueryBBox};
use crate::results::SearchResult;
use crate::search::{SearchRequest, FALLBACK_TRIGGER};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

/// Body of `POST /api/search`.
///
/// Only `query` is strict. `filters` and `bbox` are kept raw so that a
/// mistyped value degrades the search instead of rejecting it.
#[derive(Debug, Default, Deserialize)]
pub struct SearchBody {
    pub query: Option<Value>,
    pub filters: Option<Value>,
    pub bbox: Option<Value>,
}

/// Filter flags as sent by clients; absent or `null` means included
#[derive(Debug, Default, Deserialize)]
pub struct FilterFlags {
    pub city: Option<bool>,
    pub state: Option<bool>,
    pub county: Option<bool>,
}

impl From<FilterFlags> for FilterSet {
    fn from(flags: FilterFlags) -> Self {
        FilterSet::new(
            flags.city.unwrap_or(true),
            flags.state.unwrap_or(true),
            flags.county.unwrap_or(true),
        )
    }
}

impl SearchBody {
    /// Validate into a search request
    pub fn into_request(self) -> Result<SearchRequest, ApiError> {
        let query = match self.query {
            Some(Value::String(q)) if !q.trim().is_empty() => q,
            _ => return Err(ApiError::bad_request("Query parameter is required")),
        };

        let mut request = SearchRequest::simple(query);
        let mut faults = Vec::new();

        match parse_optional::<FilterFlags>(self.filters) {
            Ok(flags) => request = request.with_filters(flags.map(Into::into).unwrap_or_default()),
            Err(e) => faults.push(format!("filters: {}", e)),
        }
        match parse_optional::<QueryBBox>(self.bbox) {
            Ok(Some(bbox)) => request = request.with_bbox(bbox),
            Ok(None) => {}
            Err(e) => faults.push(format!("bbox: {}", e)),
        }

        if !faults.is_empty() {
            let reason = faults.join("; ");
            warn!("Unusable search input for '{}': {}", request.query, reason);
            request = request.with_input_fault(reason);
        }
        Ok(request)
    }
}

fn parse_optional<T: DeserializeOwned>(value: Option<Value>) -> Result<Option<T>, serde_json::Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value).map(Some),
    }
}

/// Search handler
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!("Rejected search body: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;
    let request = body.into_request()?;

    match state.search.execute(&request).await {
        Ok(outcome) => Ok(Json(outcome.results)),
        Err(e) => {
            error!("Search error: {}", e);
            Err(ApiError::internal())
        }
    }
}

/// Geometry handler; always answers with some geometry
pub async fn geometry(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let geometry = state.geometry.resolve(&id).await;
    Json(json!({ "geometry": geometry }))
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let index = state.index.clone();
    let probe = tokio::task::spawn_blocking(move || index.probe()).await;

    let (status, index) = match probe {
        Ok(Ok(status)) => ("healthy", json!({ "available": true, "records": status.records })),
        Ok(Err(e)) => {
            warn!("Health probe failed: {}", e);
            ("degraded", json!({ "available": false, "records": null }))
        }
        Err(e) => {
            error!("Health probe task failed: {}", e);
            ("degraded", json!({ "available": false, "records": null }))
        }
    };

    Json(json!({
        "status": status,
        "service": crate::SERVICE_NAME,
        "version": crate::VERSION,
        "index": index,
        "fallback_trigger": FALLBACK_TRIGGER,
    }))
}

/// Metrics handler
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}
