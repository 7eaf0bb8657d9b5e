//! Catalog record and filter types

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box of a record, in longitude/latitude degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Open intersection test against a viewport.
    ///
    /// Evaluated literally: an inverted viewport is not normalized first.
    pub fn intersects(&self, view: &QueryBBox) -> bool {
        self.xmin <= view.east
            && self.xmax >= view.west
            && self.ymin <= view.north
            && self.ymax >= view.south
    }
}

/// Map viewport submitted with a search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryBBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl QueryBBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

/// A catalog entry built by the offline index job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionRecord {
    pub id: String,
    pub name: String,
    /// Uppercase form of `name`, computed once at build time
    pub normalized_name: String,
    pub subtype: String,
    pub common_name: Option<String>,
    pub country: Option<String>,
    pub bbox: Option<BBox>,
}

impl DivisionRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, subtype: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            normalized_name: normalize_name(&name),
            name,
            subtype: subtype.into(),
            common_name: None,
            country: None,
            bbox: None,
        }
    }

    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_common_name(mut self, common_name: impl Into<String>) -> Self {
        self.common_name = Some(common_name.into());
        self
    }
}

/// Uppercasing shared by the index builder and the query pattern
pub fn normalize_name(name: &str) -> String {
    name.to_uppercase()
}

/// Place-kind restriction of a search.
///
/// Every flag defaults to `true`. All three set means no restriction at all,
/// so subtypes outside the three categories are returned too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    pub city: bool,
    pub state: bool,
    pub county: bool,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            city: true,
            state: true,
            county: true,
        }
    }
}

/// How a FilterSet constrains dataset subtypes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtypeFilter {
    /// No restriction
    Any,
    /// Restrict to this union of subtypes
    OneOf(Vec<&'static str>),
    /// Degenerate all-false set: nothing can match
    Nothing,
}

pub const CITY_SUBTYPES: &[&str] = &["locality"];
pub const STATE_SUBTYPES: &[&str] = &["region", "country"];
pub const COUNTY_SUBTYPES: &[&str] = &["county"];

impl FilterSet {
    pub fn new(city: bool, state: bool, county: bool) -> Self {
        Self {
            city,
            state,
            county,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.city && self.state && self.county
    }

    pub fn is_empty(&self) -> bool {
        !self.city && !self.state && !self.county
    }

    /// Exactly one flag set; returns it as the provider category hint
    pub fn single_category(&self) -> Option<&'static str> {
        match (self.city, self.state, self.county) {
            (true, false, false) => Some("city"),
            (false, true, false) => Some("state"),
            (false, false, true) => Some("county"),
            _ => None,
        }
    }

    pub fn subtype_filter(&self) -> SubtypeFilter {
        if self.is_unrestricted() {
            return SubtypeFilter::Any;
        }
        if self.is_empty() {
            return SubtypeFilter::Nothing;
        }

        let mut subtypes = Vec::new();
        if self.city {
            subtypes.extend_from_slice(CITY_SUBTYPES);
        }
        if self.state {
            subtypes.extend_from_slice(STATE_SUBTYPES);
        }
        if self.county {
            subtypes.extend_from_slice(COUNTY_SUBTYPES);
        }
        SubtypeFilter::OneOf(subtypes)
    }

    /// Whether a record with this subtype passes the filter
    pub fn admits_subtype(&self, subtype: &str) -> bool {
        match self.subtype_filter() {
            SubtypeFilter::Any => true,
            SubtypeFilter::Nothing => false,
            SubtypeFilter::OneOf(subtypes) => subtypes.contains(&subtype),
        }
    }
}
