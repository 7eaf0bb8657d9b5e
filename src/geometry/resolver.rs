//! On-demand geometry lookup against the raw dataset snapshot

use super::simplify::simplify_geometry;
use crate::metrics::Metrics;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Simplification tolerance in degrees
pub const SIMPLIFY_TOLERANCE: f64 = 0.00001;

/// Table holding raw division geometry in the dataset snapshot
pub const GEOMETRY_TABLE: &str = "division_area";

/// Whole-world polygon returned whenever real geometry cannot be resolved
pub fn sentinel_geometry() -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[-180, -90], [180, -90], [180, 90], [-180, 90], [-180, -90]]]
    })
}

/// Errors raised while fetching raw geometry
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Geometry dataset unavailable: {0}")]
    Unavailable(String),

    #[error("Geometry query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Invalid stored geometry: {0}")]
    Decode(String),

    #[error("Geometry lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of native geometry keyed by division id
pub trait GeometrySource: Send + Sync {
    /// GeoJSON geometry for `id`, or `None` if the dataset has no such id
    fn fetch(&self, id: &str) -> Result<Option<Value>, GeometryError>;
}

/// Geometry dataset stored as a read-only SQLite snapshot.
///
/// Opened per lookup; nothing is cached between calls.
pub struct SqliteGeometrySource {
    path: PathBuf,
}

impl SqliteGeometrySource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GeometrySource for SqliteGeometrySource {
    fn fetch(&self, id: &str) -> Result<Option<Value>, GeometryError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags).map_err(|e| {
            GeometryError::Unavailable(format!("cannot open {}: {}", self.path.display(), e))
        })?;

        let text: Option<Option<String>> = conn
            .query_row(
                &format!("SELECT geometry FROM {} WHERE id = ?1 LIMIT 1", GEOMETRY_TABLE),
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(Some(text)) = text else {
            return Ok(None);
        };

        let geometry: Value =
            serde_json::from_str(&text).map_err(|e| GeometryError::Decode(e.to_string()))?;
        match geometry {
            Value::Null => Ok(None),
            Value::Object(_) => Ok(Some(geometry)),
            other => Err(GeometryError::Decode(format!(
                "expected a GeoJSON object, found {}",
                other
            ))),
        }
    }
}

/// Outcome of a single resolution, before the sentinel is applied
#[derive(Debug)]
pub enum Resolution {
    Found(Value),
    Missing,
    Failed(GeometryError),
}

/// Resolves simplified boundary geometry for a single division
pub struct GeometryResolver {
    source: Arc<dyn GeometrySource>,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl GeometryResolver {
    pub fn new(source: Arc<dyn GeometrySource>, timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            source,
            timeout,
            metrics,
        }
    }

    /// Geometry for `id`. Never fails; unresolvable ids yield the sentinel.
    pub async fn resolve(&self, id: &str) -> Value {
        match self.lookup(id).await {
            Resolution::Found(geometry) => {
                self.metrics.record_geometry_resolved();
                geometry
            }
            Resolution::Missing => {
                info!("No geometry for division {}, returning world sentinel", id);
                self.metrics.record_geometry_miss();
                sentinel_geometry()
            }
            Resolution::Failed(e) => {
                error!("Geometry fetch failed for {}: {}", id, e);
                self.metrics.record_geometry_error();
                sentinel_geometry()
            }
        }
    }

    /// Fetch and simplify without substituting the sentinel
    pub async fn lookup(&self, id: &str) -> Resolution {
        debug!("Fetching simplified geometry for division: {}", id);

        let source = self.source.clone();
        let key = id.to_string();
        let task = tokio::task::spawn_blocking(move || {
            source.fetch(&key).and_then(|found| {
                found
                    .map(|g| simplify_geometry(g, SIMPLIFY_TOLERANCE))
                    .transpose()
            })
        });

        match timeout(self.timeout, task).await {
            Ok(Ok(Ok(Some(geometry)))) => Resolution::Found(geometry),
            Ok(Ok(Ok(None))) => Resolution::Missing,
            Ok(Ok(Err(e))) => Resolution::Failed(e),
            Ok(Err(join_error)) => Resolution::Failed(GeometryError::Unavailable(format!(
                "lookup task failed: {}",
                join_error
            ))),
            Err(_) => {
                warn!("Geometry lookup for {} exceeded {:?}", id, self.timeout);
                Resolution::Failed(GeometryError::Timeout(self.timeout))
            }
        }
    }
}
