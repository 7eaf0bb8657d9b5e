//! Settings structures for the division search service

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main settings structure matching settings.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub catalog: CatalogSettings,
    pub geometry: GeometrySettings,
    pub fallback: FallbackSettings,
    pub outgoing: OutgoingSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read settings file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse settings from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Merge with environment variables
    pub fn merge_env(&mut self) {
        self.merge_vars(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn merge_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = lookup("DIVISIONS_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Some(val) = lookup("DIVISIONS_STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("DIVISIONS_INDEX_PATH") {
            self.catalog.index_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("DIVISIONS_GEOMETRY_PATH") {
            self.geometry.dataset_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("DIVISIONS_GEOCODER_URL") {
            self.fallback.base_url = val;
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
    /// Directory with the map front-end, served at `/`
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 4000,
            bind_address: "0.0.0.0".to_string(),
            static_dir: Some(PathBuf::from("static")),
        }
    }
}

/// Catalog index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Path of the pre-built catalog file
    pub index_path: PathBuf,
    /// Idle read-only connections kept open
    pub max_idle_connections: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./divisions_index.sqlite"),
            max_idle_connections: 8,
        }
    }
}

/// Geometry lookup bound when none is configured
const DEFAULT_GEOMETRY_TIMEOUT_SECS: u64 = 15;

/// Raw geometry dataset settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    /// Dataset snapshot holding the `division_area` table
    pub dataset_path: PathBuf,
    /// Upper bound on a single geometry lookup, in seconds
    pub timeout_secs: f64,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("./data/2025-06-25.0/division_area.sqlite"),
            timeout_secs: DEFAULT_GEOMETRY_TIMEOUT_SECS as f64,
        }
    }
}

impl GeometrySettings {
    /// Lookup timeout; values that are not a positive representable
    /// duration fall back to the default
    pub fn timeout(&self) -> Duration {
        match Duration::try_from_secs_f64(self.timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => timeout,
            _ => Duration::from_secs(DEFAULT_GEOMETRY_TIMEOUT_SECS),
        }
    }
}

/// Fallback geocoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSettings {
    /// Search endpoint of a Nominatim-compatible provider
    pub base_url: String,
    /// Identifying User-Agent sent to the provider
    pub user_agent: String,
    /// Results requested per query
    pub result_limit: u32,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: format!("DivisionShapeViewer/{}", crate::VERSION),
            result_limit: 10,
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Pool max size
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            pool_maxsize: 20,
            verify_ssl: true,
            proxies: ProxySettings::default(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}
