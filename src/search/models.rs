//! Search request and tier outcome models

use crate::catalog::{CatalogQuery, DivisionRecord, FilterSet, IndexError, QueryBBox};
use crate::results::SearchResult;
use serde::{Deserialize, Serialize};

/// A validated search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text place name pattern
    pub query: String,
    /// Place kinds to include
    #[serde(default)]
    pub filters: FilterSet,
    /// Optional map viewport
    #[serde(default)]
    pub bbox: Option<QueryBBox>,
    /// Filter or viewport input that could not be understood; the catalog
    /// tier treats it as a query fault
    #[serde(skip)]
    pub input_fault: Option<String>,
}

impl SearchRequest {
    /// Create a simple unfiltered request
    pub fn simple(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: FilterSet::default(),
            bbox: None,
            input_fault: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_bbox(mut self, bbox: QueryBBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Mark the request as carrying input the catalog cannot evaluate
    pub fn with_input_fault(mut self, reason: impl Into<String>) -> Self {
        self.input_fault = Some(reason.into());
        self
    }

    /// Catalog query for the primary tier
    pub fn catalog_query(&self) -> CatalogQuery {
        CatalogQuery::new(&self.query, self.filters, self.bbox)
    }
}

/// Which tier produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    Fallback,
    /// Both tiers failed; the response is empty
    Exhausted,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::Exhausted => "exhausted",
        }
    }
}

/// Condition that hands a search to the fallback tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTrigger {
    /// Only a failed primary query; empty primary results are final
    PrimaryFailure,
}

/// Fallback policy in force
pub const FALLBACK_TRIGGER: FallbackTrigger = FallbackTrigger::PrimaryFailure;

/// Tagged result of the primary tier
#[derive(Debug)]
pub enum PrimaryOutcome {
    /// Query ran; possibly with zero records
    Found(Vec<DivisionRecord>),
    /// Store-level fault; the fallback tier should answer
    NeedsFallback(IndexError),
    /// Anything else went wrong; not eligible for fallback
    Failed(String),
}

/// Results plus the tier that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct TieredResults {
    pub tier: Tier,
    pub results: Vec<SearchResult>,
}

impl TieredResults {
    pub fn new(tier: Tier, results: Vec<SearchResult>) -> Self {
        Self { tier, results }
    }
}
