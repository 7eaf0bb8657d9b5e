//! Route definitions

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/api/search", post(handlers::search))
        .route("/api/geometry/:id", get(handlers::geometry))
        .route("/api/health", get(handlers::health))
        .route("/api/metrics", get(handlers::metrics));

    // Front-end files, with index.html at `/`
    if let Some(dir) = &state.settings.server.static_dir {
        info!("Serving static files from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router.layer(cors).with_state(state)
}
