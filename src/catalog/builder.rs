//! Writer for the catalog file consumed by [`SqliteIndex`](super::SqliteIndex)

use super::models::{normalize_name, DivisionRecord};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

const SCHEMA: &str = r#"
CREATE TABLE divisions_index (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    name_upper TEXT NOT NULL,
    subtype TEXT,
    common_name TEXT,
    country TEXT,
    bbox_xmin REAL,
    bbox_ymin REAL,
    bbox_xmax REAL,
    bbox_ymax REAL
)
"#;

const INDEXES: [&str; 5] = [
    "CREATE INDEX idx_name ON divisions_index(name)",
    "CREATE INDEX idx_name_upper ON divisions_index(name_upper)",
    "CREATE INDEX idx_subtype ON divisions_index(subtype)",
    "CREATE INDEX idx_country ON divisions_index(country)",
    "CREATE INDEX idx_name_subtype ON divisions_index(name_upper, subtype)",
];

/// Builds a fresh catalog file. Any existing file at the path is replaced.
pub struct IndexBuilder {
    conn: Connection,
    inserted: usize,
    skipped: usize,
}

impl IndexBuilder {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("cannot remove {}", path.display()))?;
            info!("Removed existing catalog at {}", path.display());
        }

        let conn = Connection::open(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "OFF")?;
        conn.pragma_update(None, "synchronous", "OFF")?;
        conn.execute(SCHEMA, [])?;
        conn.execute_batch("BEGIN")?;

        Ok(Self {
            conn,
            inserted: 0,
            skipped: 0,
        })
    }

    /// Insert one record. Records with an empty name are skipped.
    pub fn insert(&mut self, record: &DivisionRecord) -> Result<()> {
        if record.name.trim().is_empty() {
            self.skipped += 1;
            return Ok(());
        }

        let bbox = record.bbox;
        self.conn.execute(
            "INSERT INTO divisions_index (id, name, name_upper, subtype, common_name, country, \
             bbox_xmin, bbox_ymin, bbox_xmax, bbox_ymax) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                record.name,
                normalize_name(&record.name),
                record.subtype,
                record.common_name,
                record.country,
                bbox.map(|b| b.xmin),
                bbox.map(|b| b.ymin),
                bbox.map(|b| b.xmax),
                bbox.map(|b| b.ymax),
            ],
        )?;
        self.inserted += 1;
        Ok(())
    }

    pub fn insert_all(&mut self, records: &[DivisionRecord]) -> Result<()> {
        for record in records {
            self.insert(record)?;
        }
        Ok(())
    }

    /// Commit, create lookup indexes and return the number of inserted rows
    pub fn finish(self) -> Result<usize> {
        self.conn.execute_batch("COMMIT")?;
        for index_sql in INDEXES {
            self.conn.execute(index_sql, [])?;
        }
        info!(
            "Catalog built with {} entries ({} skipped) and {} indexes",
            self.inserted,
            self.skipped,
            INDEXES.len()
        );
        Ok(self.inserted)
    }
}
