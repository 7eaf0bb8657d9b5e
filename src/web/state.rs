//! Application state shared across handlers

use crate::catalog::DivisionIndex;
use crate::config::Settings;
use crate::geocoder::Geocoder;
use crate::geometry::{GeometryResolver, GeometrySource};
use crate::metrics::Metrics;
use crate::search::Search;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Catalog index, also probed by the health check
    pub index: Arc<dyn DivisionIndex>,
    /// Search orchestrator
    pub search: Arc<Search>,
    /// On-demand geometry
    pub geometry: Arc<GeometryResolver>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire the components together around one metrics collector
    pub fn new(
        settings: Settings,
        index: Arc<dyn DivisionIndex>,
        geocoder: Arc<dyn Geocoder>,
        geometry_source: Arc<dyn GeometrySource>,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let search = Arc::new(Search::new(index.clone(), geocoder, metrics.clone()));
        let geometry = Arc::new(GeometryResolver::new(
            geometry_source,
            settings.geometry.timeout(),
            metrics.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            index,
            search,
            geometry,
            metrics,
        }
    }
}
