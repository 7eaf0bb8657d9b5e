//! Result type definitions

use crate::catalog::DivisionRecord;
use serde::{Deserialize, Serialize};

/// Simplified place kind shown to clients
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    City,
    County,
    State,
    #[default]
    Region,
}

impl ResultType {
    /// Map a dataset subtype to its display kind
    pub fn from_subtype(subtype: &str) -> Self {
        match subtype {
            "locality" => Self::City,
            "county" => Self::County,
            "region" | "country" => Self::State,
            _ => Self::Region,
        }
    }

    /// Fixed administrative level for a display kind
    pub fn admin_level(&self) -> u8 {
        match self {
            Self::City => 8,
            Self::County => 6,
            Self::State => 4,
            Self::Region => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::City => "city",
            Self::County => "county",
            Self::State => "state",
            Self::Region => "region",
        }
    }
}

impl std::fmt::Display for ResultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative level of a dataset subtype; 0 when unknown
pub fn subtype_admin_level(subtype: &str) -> u8 {
    match subtype {
        "locality" => 8,
        "county" => 6,
        "region" => 4,
        "country" => 2,
        _ => 0,
    }
}

const UNKNOWN: &str = "Unknown";

/// A single search result, identical in shape for both tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub result_type: ResultType,
    pub region: String,
    pub country: String,
    pub admin_level: u8,
    pub population: Option<u64>,
    /// GeoJSON geometry; `None` for catalog results, fetched on demand
    pub geometry: Option<serde_json::Value>,
}

impl SearchResult {
    pub fn new(id: impl Into<String>, name: impl Into<String>, result_type: ResultType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            result_type,
            region: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            admin_level: result_type.admin_level(),
            population: None,
            geometry: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }

    pub fn with_geometry(mut self, geometry: serde_json::Value) -> Self {
        self.geometry = Some(geometry);
        self
    }
}

impl From<DivisionRecord> for SearchResult {
    fn from(record: DivisionRecord) -> Self {
        let name = if !record.name.is_empty() {
            record.name
        } else {
            record
                .common_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };
        let country = record
            .country
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            id: record.id,
            name,
            result_type: ResultType::from_subtype(&record.subtype),
            region: country.clone(),
            country,
            admin_level: subtype_admin_level(&record.subtype),
            population: None,
            geometry: None,
        }
    }
}
