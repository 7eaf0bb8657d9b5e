//! HTTP API tests against the router with in-memory components

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use division_search::catalog::{
    BBox, CatalogQuery, DivisionIndex, DivisionRecord, FilterSet, IndexBuilder, IndexError,
    IndexStatus, SqliteIndex,
};
use division_search::config::Settings;
use division_search::geocoder::{Geocoder, GeocoderError};
use division_search::geometry::{sentinel_geometry, GeometryError, GeometrySource};
use division_search::results::{ResultType, SearchResult};
use division_search::web::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

struct BrokenIndex;

impl DivisionIndex for BrokenIndex {
    fn search(&self, _query: &CatalogQuery) -> Result<Vec<DivisionRecord>, IndexError> {
        Err(IndexError::Unavailable("catalog offline".to_string()))
    }

    fn probe(&self) -> Result<IndexStatus, IndexError> {
        Err(IndexError::Unavailable("catalog offline".to_string()))
    }
}

struct FakeGeocoder {
    results: Option<Vec<SearchResult>>,
    calls: AtomicUsize,
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search(
        &self,
        _query: &str,
        _filters: &FilterSet,
    ) -> Result<Vec<SearchResult>, GeocoderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.clone().ok_or(GeocoderError::Status(502))
    }
}

struct OneShape;

impl GeometrySource for OneShape {
    fn fetch(&self, id: &str) -> Result<Option<Value>, GeometryError> {
        match id {
            "sf" => Ok(Some(json!({"type": "Point", "coordinates": [-122.4, 37.77]}))),
            "broken" => Err(GeometryError::Decode("bad text".to_string())),
            _ => Ok(None),
        }
    }
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.server.static_dir = None;
    settings
}

fn geocoder(results: Option<Vec<SearchResult>>) -> Arc<FakeGeocoder> {
    Arc::new(FakeGeocoder {
        results,
        calls: AtomicUsize::new(0),
    })
}

/// Router over a real catalog file holding a few records
fn catalog_app(dir: &tempfile::TempDir) -> Router {
    catalog_app_with(dir, geocoder(None))
}

fn catalog_app_with(dir: &tempfile::TempDir, geocoder: Arc<FakeGeocoder>) -> Router {
    let path = dir.path().join("divisions_index.sqlite");
    let mut builder = IndexBuilder::create(&path).unwrap();
    builder
        .insert_all(&[
            DivisionRecord::new("sf", "San Francisco", "locality")
                .with_country("US")
                .with_bbox(BBox::new(-122.52, 37.70, -122.35, 37.83)),
            DivisionRecord::new("sd", "San Diego County", "county")
                .with_country("US")
                .with_bbox(BBox::new(-117.6, 32.5, -116.1, 33.5)),
            DivisionRecord::new("ca", "California", "region").with_country("US"),
        ])
        .unwrap();
    builder.finish().unwrap();

    let index = SqliteIndex::open(&path, 2).unwrap();
    let state = AppState::new(
        settings(),
        Arc::new(index),
        geocoder,
        Arc::new(OneShape),
    );
    create_router(state)
}

fn fallback_app(geocoder: Arc<FakeGeocoder>) -> Router {
    let state = AppState::new(settings(), Arc::new(BrokenIndex), geocoder, Arc::new(OneShape));
    create_router(state)
}

async fn post_search(app: Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/search")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_search_with_viewport() {
    let dir = tempfile::tempdir().unwrap();

    let (status, body) = post_search(
        catalog_app(&dir),
        r#"{"query": "san", "bbox": {"west": -123, "south": 37, "east": -122, "north": 38}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "id": "sf",
            "name": "San Francisco",
            "type": "city",
            "region": "US",
            "country": "US",
            "admin_level": 8,
            "population": null,
            "geometry": null
        }])
    );

    let (status, body) = post_search(
        catalog_app(&dir),
        r#"{"query": "san", "bbox": {"west": 10, "south": 10, "east": 11, "north": 11}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_search_filters_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let (_, body) = post_search(catalog_app(&dir), r#"{"query": "a"}"#).await;
    let names: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["California", "San Diego County", "San Francisco"]);

    let (_, body) = post_search(
        catalog_app(&dir),
        r#"{"query": "a", "filters": {"city": false, "state": false}}"#,
    )
    .await;
    assert_eq!(body[0]["id"], "sd");
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    for body in [r#"{"query": ""}"#, r#"{"query": "   "}"#, r#"{"filters": {}}"#] {
        let (status, response) = post_search(catalog_app(&dir), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({"error": "Query parameter is required"}));
    }
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let (status, response) = post_search(catalog_app(&dir), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].is_string());
}

#[tokio::test]
async fn test_fallback_answers_when_catalog_fails() {
    let geocoder = geocoder(Some(vec![SearchResult::new(
        "osm_1",
        "Denver",
        ResultType::City,
    )]));
    let (status, body) = post_search(fallback_app(geocoder.clone()), r#"{"query": "denver"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], "osm_1");
    assert_eq!(body[0]["admin_level"], 8);
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_mistyped_filters_or_bbox_use_fallback() {
    let dir = tempfile::tempdir().unwrap();
    for body in [
        r#"{"query": "san", "bbox": {"west": "abc", "south": 37}}"#,
        r#"{"query": "san", "filters": {"city": "no"}}"#,
    ] {
        let geocoder = geocoder(Some(vec![SearchResult::new(
            "osm_7",
            "Santa Fe",
            ResultType::City,
        )]));
        let (status, response) = post_search(catalog_app_with(&dir, geocoder.clone()), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response[0]["id"], "osm_7");
        assert_eq!(response.as_array().unwrap().len(), 1);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_fallback_results_capped() {
    let results = (0..30)
        .map(|i| SearchResult::new(format!("osm_{}", i), format!("Town {}", i), ResultType::City))
        .collect();
    let (status, body) = post_search(fallback_app(geocoder(Some(results))), r#"{"query": "town"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 20);
    assert_eq!(body[19]["id"], "osm_19");
}

#[tokio::test]
async fn test_both_tiers_failing_is_empty_ok() {
    let geocoder = geocoder(None);
    let (status, body) = post_search(fallback_app(geocoder.clone()), r#"{"query": "x"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_geometry_endpoint() {
    let dir = tempfile::tempdir().unwrap();

    let (status, body) = get(catalog_app(&dir), "/api/geometry/sf").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["geometry"]["type"], "Point");

    let (status, body) = get(catalog_app(&dir), "/api/geometry/unknown").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"geometry": sentinel_geometry()}));

    let (status, body) = get(catalog_app(&dir), "/api/geometry/broken").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["geometry"], sentinel_geometry());
}

#[tokio::test]
async fn test_health_reflects_index() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = get(catalog_app(&dir), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "overture-maps-viewer");
    assert_eq!(body["index"], json!({"available": true, "records": 3}));
    assert_eq!(body["fallback_trigger"], "primary_failure");

    let (status, body) = get(fallback_app(geocoder(None)), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["index"]["available"], false);
}

#[tokio::test]
async fn test_metrics_count_tiers() {
    let state = AppState::new(
        settings(),
        Arc::new(BrokenIndex),
        geocoder(None),
        Arc::new(OneShape),
    );
    let metrics = state.metrics.clone();
    let app = create_router(state);

    post_search(app.clone(), r#"{"query": "x"}"#).await;
    let (status, body) = get(app, "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["searches"], 1);
    assert_eq!(body["primary_failures"], 1);
    assert_eq!(body["fallback_failures"], 1);
    assert_eq!(metrics.snapshot().fallback_failures, 1);
}
