//! Nominatim fallback geocoder

use super::traits::*;
use crate::catalog::FilterSet;
use crate::config::FallbackSettings;
use crate::network::HttpClient;
use crate::results::{ResultType, SearchResult};
use crate::MAX_RESULTS;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Top level of a GeoJSON search response; `features` is required
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Value>,
}

/// Geocoder backed by a Nominatim-compatible search endpoint
pub struct Nominatim {
    client: HttpClient,
    base_url: String,
    limit: u32,
}

impl Nominatim {
    pub fn new(client: HttpClient, settings: &FallbackSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.clone(),
            limit: settings.result_limit.clamp(1, MAX_RESULTS as u32),
        }
    }

    /// Build the HTTP request for a search
    pub fn request(&self, query: &str, filters: &FilterSet) -> ProviderRequest {
        let mut request = ProviderRequest::get(&self.base_url)
            .param("q", query)
            .param("format", "geojson")
            .param("limit", self.limit.to_string())
            .param("polygon_geojson", "1")
            .param("addressdetails", "1")
            .param("extratags", "1");

        // The provider takes one coarse category; counties have no hint
        if let Some(category @ ("city" | "state")) = filters.single_category() {
            request = request.param("featuretype", category);
        }

        request
    }

    /// Parse the provider response into results, applying `filters` locally
    pub fn response(
        &self,
        response: ProviderResponse,
        filters: &FilterSet,
    ) -> Result<Vec<SearchResult>, GeocoderError> {
        if !response.is_success() {
            return Err(GeocoderError::Status(response.status));
        }

        let collection: FeatureCollection = serde_json::from_str(&response.text)?;

        let mut results = Vec::new();
        for (position, feature) in collection.features.iter().enumerate() {
            let Some(result) = feature_to_result(feature, position) else {
                warn!("Skipping malformed {} feature at position {}", self.name(), position);
                continue;
            };

            if !admits(filters, result.result_type) {
                debug!("Filtered out {} ({})", result.name, result.result_type);
                continue;
            }
            results.push(result);
        }

        Ok(results)
    }
}

#[async_trait]
impl Geocoder for Nominatim {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn search(
        &self,
        query: &str,
        filters: &FilterSet,
    ) -> Result<Vec<SearchResult>, GeocoderError> {
        info!("Using {} fallback for query: {}", self.name(), query);
        debug!(
            "Calling {} as '{}' with a {:?} timeout",
            self.base_url,
            self.client.user_agent(),
            self.client.timeout()
        );
        let request = self.request(query, filters);
        let response = self.client.execute(request).await?;
        let results = self.response(response, filters)?;
        info!("{} returned {} results", self.name(), results.len());
        Ok(results)
    }
}

/// Post-filter for provider results.
///
/// `region` has no flag of its own and survives any filter with a flag set.
pub fn admits(filters: &FilterSet, result_type: ResultType) -> bool {
    if filters.is_empty() {
        return false;
    }
    match result_type {
        ResultType::City => filters.city,
        ResultType::State => filters.state,
        ResultType::County => filters.county,
        ResultType::Region => true,
    }
}

/// Substring heuristic over the provider's type strings
pub fn classify(osm_type: &str, address_type: &str, place_type: &str) -> ResultType {
    let labels = [osm_type, address_type, place_type].map(str::to_lowercase);
    let any = |needles: &[&str]| {
        labels
            .iter()
            .any(|label| needles.iter().any(|needle| label.contains(needle)))
    };

    if any(&["city", "town"]) {
        ResultType::City
    } else if any(&["state", "province"]) {
        ResultType::State
    } else if any(&["county"]) {
        ResultType::County
    } else {
        ResultType::Region
    }
}

fn str_prop<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or_default()
}

fn feature_to_result(feature: &Value, position: usize) -> Option<SearchResult> {
    let feature = feature.as_object()?;
    let empty = Value::Null;
    let props = feature.get("properties").unwrap_or(&empty);
    if !(props.is_object() || props.is_null()) {
        return None;
    }
    let address = props.get("address").unwrap_or(&empty);

    let result_type = classify(
        str_prop(props, "type"),
        str_prop(props, "addresstype"),
        str_prop(props, "place_type"),
    );

    let id = match props.get("osm_id") {
        Some(Value::Number(n)) => format!("osm_{}", n),
        Some(Value::String(s)) if !s.is_empty() => format!("osm_{}", s),
        _ => format!("osm_{}", position),
    };

    let name = str_prop(props, "display_name")
        .split(',')
        .next()
        .unwrap_or_default()
        .trim();

    let state = str_prop(address, "state");
    let country = str_prop(address, "country");
    let region = [state, country]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let mut result = SearchResult::new(id, name, result_type);
    if !region.is_empty() {
        result = result.with_region(region);
    }
    if !country.is_empty() {
        result = result.with_country(country);
    }
    if let Some(population) = props
        .get("extratags")
        .and_then(|tags| tags.get("population"))
        .and_then(parse_population)
    {
        result = result.with_population(population);
    }
    if let Some(geometry) = feature.get("geometry").filter(|g| !g.is_null()) {
        result = result.with_geometry(geometry.clone());
    }

    Some(result)
}

fn parse_population(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().replace([',', ' '], "").parse().ok(),
        _ => None,
    }
}
