//! Read-only SQLite catalog with a small connection pool

use super::models::{BBox, DivisionRecord};
use super::query::{CatalogQuery, INDEX_TABLE};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Row};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by the catalog store
#[derive(Debug, Error)]
pub enum IndexError {
    /// Store cannot be opened or the catalog table is missing
    #[error("Catalog index unavailable: {0}")]
    Unavailable(String),

    /// Query execution failed
    #[error("Catalog query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// Filter or viewport input the catalog cannot evaluate
    #[error("Invalid catalog query: {0}")]
    InvalidQuery(String),
}

/// Liveness snapshot reported by an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStatus {
    pub records: u64,
}

/// Read-only handle to the lightweight catalog.
///
/// Shared by all requests; implementations must allow concurrent reads.
pub trait DivisionIndex: Send + Sync {
    /// Filtered search, at most `query.limit` records ordered by name
    fn search(&self, query: &CatalogQuery) -> Result<Vec<DivisionRecord>, IndexError>;

    /// Cheap availability check for health reporting
    fn probe(&self) -> Result<IndexStatus, IndexError>;
}

/// SQLite-backed catalog index
pub struct SqliteIndex {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
    records: u64,
}

impl SqliteIndex {
    /// Open and verify the catalog. Fails if the file or table is missing.
    pub fn open<P: AsRef<Path>>(path: P, max_idle: usize) -> Result<Self, IndexError> {
        let path = path.as_ref().to_path_buf();
        let conn = open_read_only(&path)?;
        verify_table(&conn)?;

        let records: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", INDEX_TABLE), [], |row| {
                row.get(0)
            })?;
        info!(
            "Using pre-built divisions index at {} with {} entries",
            path.display(),
            records
        );

        Ok(Self {
            path,
            idle: Mutex::new(vec![conn]),
            max_idle: max_idle.max(1),
            records: records.max(0) as u64,
        })
    }

    fn checkout(&self) -> Result<PooledConnection<'_>, IndexError> {
        let pooled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let conn = match pooled {
            Some(conn) => conn,
            None => {
                debug!("Opening additional catalog connection");
                open_read_only(&self.path)?
            }
        };

        Ok(PooledConnection {
            conn: Some(conn),
            index: self,
        })
    }

    fn checkin(&self, conn: Connection) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }
}

impl DivisionIndex for SqliteIndex {
    fn search(&self, query: &CatalogQuery) -> Result<Vec<DivisionRecord>, IndexError> {
        if query.is_empty() {
            debug!("All place kinds disabled, skipping catalog query");
            return Ok(Vec::new());
        }

        let (sql, params) = query.to_sql();
        debug!("Catalog query: {} ({} params)", sql, params.len());

        let conn = self.checkout()?;
        let mut stmt = conn.prepare_cached(&sql)?;
        let records = stmt
            .query_map(params_from_iter(params.iter()), record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn probe(&self) -> Result<IndexStatus, IndexError> {
        let conn = self.checkout()?;
        verify_table(&conn)?;
        conn.query_row(&format!("SELECT 1 FROM {} LIMIT 1", INDEX_TABLE), [], |_| Ok(()))
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(()),
                other => Err(other),
            })?;
        Ok(IndexStatus {
            records: self.records,
        })
    }
}

/// Connection on loan from the pool; returned on drop
struct PooledConnection<'a> {
    conn: Option<Connection>,
    index: &'a SqliteIndex,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only taken in drop
        self.conn.as_ref().expect("pooled connection already returned")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.index.checkin(conn);
        }
    }
}

fn open_read_only(path: &Path) -> Result<Connection, IndexError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(path, flags).map_err(|e| {
        IndexError::Unavailable(format!("cannot open {}: {}", path.display(), e))
    })
}

fn verify_table(conn: &Connection) -> Result<(), IndexError> {
    let tables: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![INDEX_TABLE],
        |row| row.get(0),
    )?;

    if tables == 0 {
        return Err(IndexError::Unavailable(format!(
            "table '{}' not found",
            INDEX_TABLE
        )));
    }
    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<DivisionRecord> {
    let xmin: Option<f64> = row.get(6)?;
    let ymin: Option<f64> = row.get(7)?;
    let xmax: Option<f64> = row.get(8)?;
    let ymax: Option<f64> = row.get(9)?;

    let bbox = match (xmin, ymin, xmax, ymax) {
        (Some(xmin), Some(ymin), Some(xmax), Some(ymax)) => Some(BBox::new(xmin, ymin, xmax, ymax)),
        _ => None,
    };

    Ok(DivisionRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        normalized_name: row.get(2)?,
        subtype: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        common_name: row.get(4)?,
        country: row.get(5)?,
        bbox,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FilterSet, IndexBuilder, QueryBBox};
    use crate::MAX_RESULTS;
    use tempfile::TempDir;

    fn build(records: &[DivisionRecord]) -> (TempDir, SqliteIndex) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("divisions_index.sqlite");
        let mut builder = IndexBuilder::create(&path).unwrap();
        builder.insert_all(records).unwrap();
        builder.finish().unwrap();
        let index = SqliteIndex::open(&path, 2).unwrap();
        (dir, index)
    }

    fn san_francisco() -> DivisionRecord {
        DivisionRecord::new("sf", "San Francisco", "locality")
            .with_country("US")
            .with_bbox(BBox::new(-122.52, 37.70, -122.35, 37.83))
    }

    fn names(records: &[DivisionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    fn catalog() -> Vec<DivisionRecord> {
        vec![
            san_francisco(),
            DivisionRecord::new("sfc", "San Francisco County", "county")
                .with_bbox(BBox::new(-122.6, 37.6, -122.3, 37.9)),
            DivisionRecord::new("sd", "San Diego", "locality")
                .with_bbox(BBox::new(-117.3, 32.5, -116.9, 33.1)),
            DivisionRecord::new("sl", "San Luis Potosí", "region"),
            DivisionRecord::new("sm", "San Marino", "country")
                .with_bbox(BBox::new(12.40, 43.89, 12.52, 43.99)),
            DivisionRecord::new("mh", "Sandy Hook", "macrohood")
                .with_bbox(BBox::new(-74.02, 40.42, -73.99, 40.48)),
        ]
    }

    #[test]
    fn test_viewport_includes_and_excludes() {
        let (_dir, index) = build(&[san_francisco()]);

        let inside = CatalogQuery::new(
            "San",
            FilterSet::default(),
            Some(QueryBBox::new(-123.0, 37.0, -122.0, 38.0)),
        );
        assert_eq!(names(&index.search(&inside).unwrap()), vec!["San Francisco"]);

        let elsewhere = CatalogQuery::new(
            "San",
            FilterSet::default(),
            Some(QueryBBox::new(10.0, 10.0, 11.0, 11.0)),
        );
        assert!(index.search(&elsewhere).unwrap().is_empty());
    }

    #[test]
    fn test_case_insensitive_match() {
        let (_dir, index) = build(&catalog());
        let lower = index
            .search(&CatalogQuery::new("san", FilterSet::default(), None))
            .unwrap();
        let upper = index
            .search(&CatalogQuery::new("SAN", FilterSet::default(), None))
            .unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.len(), 6);
    }

    #[test]
    fn test_non_ascii_case_insensitive_match() {
        let (_dir, index) = build(&catalog());
        let results = index
            .search(&CatalogQuery::new("potosí", FilterSet::default(), None))
            .unwrap();
        assert_eq!(names(&results), vec!["San Luis Potosí"]);
    }

    #[test]
    fn test_wildcards_are_literal() {
        let (_dir, index) = build(&catalog());
        let results = index
            .search(&CatalogQuery::new("S%N", FilterSet::default(), None))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_all_true_filters_include_other_subtypes() {
        let (_dir, index) = build(&catalog());
        let results = index
            .search(&CatalogQuery::new("sand", FilterSet::default(), None))
            .unwrap();
        assert_eq!(results[0].subtype, "macrohood");
    }

    #[test]
    fn test_city_off_never_returns_locality() {
        let (_dir, index) = build(&catalog());
        let results = index
            .search(&CatalogQuery::new("san", FilterSet::new(false, true, true), None))
            .unwrap();
        assert!(results.iter().all(|r| r.subtype != "locality"));
        assert_eq!(
            names(&results),
            vec!["San Francisco County", "San Luis Potosí", "San Marino"]
        );
    }

    #[test]
    fn test_all_false_filters_return_nothing() {
        let (_dir, index) = build(&catalog());
        let results = index
            .search(&CatalogQuery::new("san", FilterSet::new(false, false, false), None))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_records_without_bbox_excluded_from_spatial_queries() {
        let (_dir, index) = build(&catalog());
        let world = QueryBBox::new(-180.0, -90.0, 180.0, 90.0);
        let results = index
            .search(&CatalogQuery::new("potosí", FilterSet::default(), Some(world)))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_results_capped_and_ordered_by_name() {
        let records: Vec<_> = (0..30)
            .rev()
            .map(|i| DivisionRecord::new(format!("id{:02}", i), format!("Springfield {:02}", i), "locality"))
            .collect();
        let (_dir, index) = build(&records);

        let results = index
            .search(&CatalogQuery::new("spring", FilterSet::default(), None))
            .unwrap();
        assert_eq!(results.len(), MAX_RESULTS);
        assert_eq!(results[0].name, "Springfield 00");
        assert!(results.windows(2).all(|w| w[0].name <= w[1].name));
    }

    #[test]
    fn test_equal_names_ordered_by_id() {
        let records = vec![
            DivisionRecord::new("b", "Portland", "locality"),
            DivisionRecord::new("a", "Portland", "locality"),
        ];
        let (_dir, index) = build(&records);
        let query = CatalogQuery::new("portland", FilterSet::default(), None);
        let first = index.search(&query).unwrap();
        let second = index.search(&query).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].id, "a");
    }

    #[test]
    fn test_full_containment_is_always_returned() {
        let (_dir, index) = build(&catalog());
        for record in catalog().into_iter().filter(|r| r.bbox.is_some()) {
            let bbox = record.bbox.unwrap();
            let view = QueryBBox::new(bbox.xmin - 0.5, bbox.ymin - 0.5, bbox.xmax + 0.5, bbox.ymax + 0.5);
            let results = index
                .search(&CatalogQuery::new(&record.name, FilterSet::default(), Some(view)))
                .unwrap();
            assert!(results.iter().any(|r| r.id == record.id), "missing {}", record.id);
        }
    }

    #[test]
    fn test_record_fields_round_trip() {
        let (_dir, index) = build(&[san_francisco().with_common_name("SF")]);
        let results = index
            .search(&CatalogQuery::new("francisco", FilterSet::default(), None))
            .unwrap();
        assert_eq!(results, vec![san_francisco().with_common_name("SF")]);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteIndex::open(dir.path().join("absent.sqlite"), 2);
        assert!(matches!(result, Err(IndexError::Unavailable(_))));
    }

    #[test]
    fn test_missing_table_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.sqlite");
        Connection::open(&path)
            .unwrap()
            .execute("CREATE TABLE other (id TEXT)", [])
            .unwrap();
        let result = SqliteIndex::open(&path, 2);
        assert!(matches!(result, Err(IndexError::Unavailable(_))));
    }

    #[test]
    fn test_probe_reports_record_count() {
        let (_dir, index) = build(&catalog());
        assert_eq!(index.probe().unwrap(), IndexStatus { records: 6 });
    }

    #[test]
    fn test_concurrent_reads() {
        let (_dir, index) = build(&catalog());
        let index = std::sync::Arc::new(index);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = index.clone();
                std::thread::spawn(move || {
                    index
                        .search(&CatalogQuery::new("san", FilterSet::default(), None))
                        .unwrap()
                        .len()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 6);
        }
    }
}
