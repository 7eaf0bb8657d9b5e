//! Builds the catalog file from a division-area export.
//!
//! Input is newline-delimited JSON, one division-area row per line:
//! `{"id", "names": {"primary", "common"}, "subtype", "country", "bbox": {"xmin", "ymin", "xmax", "ymax"}}`.

use anyhow::{bail, Context, Result};
use division_search::catalog::{BBox, DivisionRecord, IndexBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Rows are handed to the builder in chunks of this size to bound memory;
/// the whole build is still one transaction
const BATCH_SIZE: usize = 10_000;

#[derive(Debug, Deserialize)]
struct ExportRow {
    id: String,
    #[serde(default)]
    names: Names,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    bbox: Option<BBox>,
}

#[derive(Debug, Default, Deserialize)]
struct Names {
    primary: Option<String>,
    /// Either a plain string or a map of language tag to name
    common: Option<Value>,
}

impl ExportRow {
    fn into_record(self) -> Option<DivisionRecord> {
        let name = self.names.primary.filter(|n| !n.is_empty())?;
        let mut record = DivisionRecord::new(self.id, name, self.subtype.unwrap_or_default());
        if let Some(common) = self.names.common.as_ref().and_then(common_name) {
            record = record.with_common_name(common);
        }
        if let Some(country) = self.country {
            record = record.with_country(country);
        }
        if let Some(bbox) = self.bbox {
            record = record.with_bbox(bbox);
        }
        Some(record)
    }
}

fn common_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("en")
            .or_else(|| map.values().next())
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => None,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(input), output) = (args.next(), args.next()) else {
        bail!("usage: build-index <export.jsonl> [output.sqlite]");
    };
    let input = PathBuf::from(input);
    let output = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./divisions_index.sqlite"));

    let reader = BufReader::new(
        File::open(&input).with_context(|| format!("cannot open {}", input.display()))?,
    );
    let mut builder = IndexBuilder::create(&output)?;
    info!("Building catalog at {} from {}", output.display(), input.display());

    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut unnamed = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read error at line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let row: ExportRow = match serde_json::from_str(&line) {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping line {}: {}", line_no + 1, e);
                continue;
            }
        };
        match row.into_record() {
            Some(record) => batch.push(record),
            None => unnamed += 1,
        }

        if batch.len() >= BATCH_SIZE {
            builder.insert_all(&batch)?;
            batch.clear();
        }
    }
    builder.insert_all(&batch)?;

    let count = builder.finish()?;
    if unnamed > 0 {
        info!("Ignored {} rows without a primary name", unnamed);
    }

    let size_mb = std::fs::metadata(&output)?.len() as f64 / (1024.0 * 1024.0);
    info!("Catalog holds {} entries ({:.1} MB)", count, size_mb);
    Ok(())
}
