//! Division Search: place-name lookup service for the boundary viewer
//!
//! This is the main entry point for the application.

use anyhow::{Context, Result};
use division_search::{
    catalog::SqliteIndex,
    config,
    geocoder::Nominatim,
    geometry::SqliteGeometrySource,
    network::HttpClient,
    web::{create_router, AppState},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "-V" | "--version" => {
                println!("division-search {}", division_search::VERSION);
                return Ok(());
            }
            _ => {}
        }
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Starting Division Search v{}", division_search::VERSION);

    let settings = config::load()?;

    // A missing catalog is fatal; never serve without one
    let index = SqliteIndex::open(
        &settings.catalog.index_path,
        settings.catalog.max_idle_connections,
    )
    .with_context(|| {
        format!(
            "catalog index unavailable at {}; build it with `build-index`",
            settings.catalog.index_path.display()
        )
    })?;

    let client = HttpClient::with_settings(&settings.outgoing, &settings.fallback)?;
    info!("HTTP client initialized");
    let geocoder = Nominatim::new(client, &settings.fallback);

    let geometry = SqliteGeometrySource::new(&settings.geometry.dataset_path);
    if !geometry.path().exists() {
        info!(
            "Geometry dataset {} not found; lookups will return the world outline",
            geometry.path().display()
        );
    }

    let addr = SocketAddr::new(
        settings.server.bind_address.parse()?,
        settings.server.port,
    );

    let state = AppState::new(settings, Arc::new(index), Arc::new(geocoder), Arc::new(geometry));
    let app = create_router(state);

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Print usage information
fn print_usage() {
    println!(
        r#"
Division Search v{}
Place-name search over administrative boundaries

USAGE:
    division-search [OPTIONS]

OPTIONS:
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT VARIABLES:
    DIVISIONS_SETTINGS_PATH  Path to settings.yml
    DIVISIONS_INDEX_PATH     Catalog index file
    DIVISIONS_GEOMETRY_PATH  Geometry dataset snapshot
    DIVISIONS_GEOCODER_URL   Fallback geocoder search endpoint
    DIVISIONS_BIND_ADDRESS   Bind address
    DIVISIONS_STATIC_DIR     Front-end directory
    PORT                     Server port
    RUST_LOG                 Log filter (default: info)
"#,
        division_search::VERSION
    );
}
