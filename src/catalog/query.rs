//! Parameterized query construction for the catalog table

use super::models::{normalize_name, DivisionRecord, FilterSet, QueryBBox, SubtypeFilter};
use crate::MAX_RESULTS;
use rusqlite::types::Value;

/// Name of the catalog table written by the index builder
pub const INDEX_TABLE: &str = "divisions_index";

const SELECT_COLUMNS: &str = "SELECT id, name, name_upper, subtype, common_name, country, \
     bbox_xmin, bbox_ymin, bbox_xmax, bbox_ymax FROM divisions_index";

/// A single catalog search
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    /// Uppercased text pattern
    pub pattern: String,
    pub filters: FilterSet,
    pub bbox: Option<QueryBBox>,
    pub limit: usize,
}

impl CatalogQuery {
    pub fn new(text: &str, filters: FilterSet, bbox: Option<QueryBBox>) -> Self {
        Self {
            pattern: normalize_name(text),
            filters,
            bbox,
            limit: MAX_RESULTS,
        }
    }

    /// The query cannot match any record
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter and viewport check for a record already matched on text
    pub fn admits(&self, record: &DivisionRecord) -> bool {
        let in_view = match self.bbox {
            Some(view) => record.bbox.map_or(false, |bbox| bbox.intersects(&view)),
            None => true,
        };
        in_view && self.filters.admits_subtype(&record.subtype)
    }

    /// Build SQL text and its bound parameters.
    ///
    /// Request-derived values only ever appear in the parameter list.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::from(SELECT_COLUMNS);
        let mut params: Vec<Value> = Vec::new();

        sql.push_str(" WHERE instr(name_upper, ?) > 0");
        params.push(Value::Text(self.pattern.clone()));

        if let Some(view) = self.bbox {
            sql.push_str(
                " AND bbox_xmin IS NOT NULL AND bbox_ymin IS NOT NULL \
                 AND bbox_xmax IS NOT NULL AND bbox_ymax IS NOT NULL \
                 AND bbox_xmin <= ? AND bbox_xmax >= ? AND bbox_ymin <= ? AND bbox_ymax >= ?",
            );
            params.push(Value::Real(view.east));
            params.push(Value::Real(view.west));
            params.push(Value::Real(view.north));
            params.push(Value::Real(view.south));
        }

        match self.filters.subtype_filter() {
            SubtypeFilter::Any => {}
            SubtypeFilter::OneOf(subtypes) => {
                let placeholders = vec!["?"; subtypes.len()].join(", ");
                sql.push_str(&format!(" AND subtype IN ({})", placeholders));
                params.extend(subtypes.into_iter().map(|s| Value::Text(s.to_string())));
            }
            // Never matches; `SqliteIndex::search` returns early for this case
            SubtypeFilter::Nothing => sql.push_str(" AND 0"),
        }

        sql.push_str(" ORDER BY name ASC, id ASC LIMIT ?");
        params.push(Value::Integer(self.limit as i64));

        (sql, params)
    }
}
