//! CSV discovery and the ingestion pipeline.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use csv::ReaderBuilder;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embedding::Embedder;
use crate::index::SongIndex;
use crate::normalize::{normalize, RowOutcome, SongRecord};
use crate::schema;

/// What one ingestion run did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
  pub files_seen: usize,
  pub files_skipped: usize,
  pub rows_skipped: usize,
  pub indexed: usize,
}

/// Find CSV sources under `dir`, sorted by path for a stable order
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>> {
  if !dir.is_dir() {
    return Err(anyhow!("Songs directory {} does not exist", dir.display()));
  }

  let mut sources = Vec::new();
  for entry in std::fs::read_dir(dir)? {
    let path = entry?.path();
    let is_csv =
      path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if path.is_file() && is_csv {
      sources.push(path);
    }
  }

  sources.sort();
  Ok(sources)
}

/// Read every discovered CSV, normalize rows up to the global cap, then
/// embed and store the accepted records as a single batch.
///
/// Broken files and rows are skipped and counted, never fatal; only a
/// missing source directory (or one with no CSVs at all) is an error,
/// and the caller decides whether that ends the process.
pub async fn ingest(
  embedder: &dyn Embedder,
  index: &SongIndex,
  config: &Config,
) -> Result<IngestReport> {
  let sources = discover_sources(&config.songs_dir)?;
  if sources.is_empty() {
    return Err(anyhow!("No CSV files found in {}", config.songs_dir.display()));
  }

  let mut report = IngestReport::default();
  let mut records: Vec<SongRecord> = Vec::new();

  for path in &sources {
    if records.len() >= config.limit {
      break;
    }

    report.files_seen += 1;
    if let Err(e) = scan_source(path, config.limit, &mut records, &mut report) {
      warn!("Skipping {}: {}", path.display(), e);
      report.files_skipped += 1;
    }
  }

  if records.is_empty() {
    warn!("No usable songs found; index left untouched");
    return Ok(report);
  }

  info!("Embedding {} songs in one batch", records.len());
  let documents: Vec<String> = records.iter().map(|r| r.document.clone()).collect();
  let embeddings = embedder.embed_documents(&documents).await?;
  index.add_batch(&records, &embeddings).await?;

  report.indexed = records.len();
  Ok(report)
}

/// Scan one CSV file, appending accepted records until the cap is hit.
///
/// `records.len()` doubles as the run-wide id counter: ids are assigned
/// from the accepted count, not the file row number.
fn scan_source(
  path: &Path,
  cap: usize,
  records: &mut Vec<SongRecord>,
  report: &mut IngestReport,
) -> Result<()> {
  let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
  let headers = reader.headers()?.clone();

  let resolved = schema::resolve(&headers)
    .ok_or_else(|| anyhow!("no recognizable title/lyrics columns in header"))?;

  for row in reader.records() {
    if records.len() >= cap {
      break;
    }

    let row = match row {
      Ok(row) => row,
      Err(e) => {
        warn!("Bad row in {}: {}", path.display(), e);
        report.rows_skipped += 1;
        continue;
      }
    };

    match normalize(&row, &resolved, records.len()) {
      RowOutcome::Song(record) => records.push(record),
      RowOutcome::Skip(reason) => {
        debug!("Skipping row in {}: {}", path.display(), reason);
        report.rows_skipped += 1;
      }
    }
  }

  Ok(())
}
