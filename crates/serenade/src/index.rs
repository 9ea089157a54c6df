//! Persistent vector index for song embeddings.
//!
//! Thin wrapper around a LanceDB table. The table is created lazily from
//! the first ingested batch (the embedding dimension comes from the
//! vectors themselves) and queried with cosine distance; the similarity
//! reported to callers is `1 - distance`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use arrow::array::{Array, FixedSizeListBuilder, Float32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchIterator};
use chrono::Utc;
use futures::stream::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use tracing::debug;

use crate::normalize::SongRecord;

/// Distance metric the collection is queried with. Fixed at cosine: the
/// `1 - distance` similarity handed to callers is only a similarity in
/// [-1, 1] under this metric, so it must never vary per call.
const DISTANCE: DistanceType = DistanceType::Cosine;

/// One ranked answer to a mood query
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
  pub title: String,
  pub artist: String,
  pub similarity: f32,
}

/// Handle to the on-disk song collection
pub struct SongIndex {
  connection: Connection,
  table_name: String,
}

impl SongIndex {
  /// Connect to the database directory, creating it if needed
  pub async fn open(db_dir: &Path, table_name: &str) -> Result<Self> {
    if !db_dir.exists() {
      std::fs::create_dir_all(db_dir)
        .map_err(|e| anyhow!("Cannot create index directory {}: {}", db_dir.display(), e))?;
    }

    let connection = connect(&db_dir.to_string_lossy())
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to open vector index at {}: {}", db_dir.display(), e))?;

    Ok(Self { connection, table_name: table_name.to_string() })
  }

  /// Number of stored songs; zero when the table has not been created yet
  pub async fn count(&self) -> Result<usize> {
    if !self.table_exists().await? {
      return Ok(0);
    }

    let count = self.table().await?.count_rows(None).await?;
    Ok(count)
  }

  /// Drop the stored collection entirely
  pub async fn clear(&self) -> Result<()> {
    if self.table_exists().await? {
      self
        .connection
        .drop_table(&self.table_name, &[])
        .await
        .map_err(|e| anyhow!("Failed to drop table '{}': {}", self.table_name, e))?;
    }
    Ok(())
  }

  /// Insert one batch of records with their vectors, creating the table
  /// on first use. Every stored record gets exactly one vector; record
  /// and vector counts must match.
  pub async fn add_batch(&self, records: &[SongRecord], embeddings: &[Vec<f32>]) -> Result<()> {
    if records.is_empty() {
      return Ok(());
    }
    if records.len() != embeddings.len() {
      return Err(anyhow!("{} records but {} embeddings", records.len(), embeddings.len()));
    }

    let batch = to_record_batch(records, embeddings)?;
    let schema = batch.schema();
    let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

    if self.table_exists().await? {
      self
        .table()
        .await?
        .add(batches)
        .execute()
        .await
        .map_err(|e| anyhow!("Failed to store songs: {}", e))?;
    } else {
      self
        .connection
        .create_table(&self.table_name, batches)
        .execute()
        .await
        .map_err(|e| anyhow!("Failed to create table '{}': {}", self.table_name, e))?;
    }

    debug!(count = records.len(), "stored song batch");
    Ok(())
  }

  /// Top-k nearest stored songs, closest first (the index's own
  /// distance-ascending order; ties stay however the index returns them)
  pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Recommendation>> {
    if !self.table_exists().await? {
      return Ok(vec![]);
    }

    let table = self.table().await?;
    let mut stream = table
      .vector_search(query)?
      .column("embedding")
      .distance_type(DISTANCE)
      .limit(k)
      .execute()
      .await
      .map_err(|e| anyhow!("Vector search failed: {}", e))?;

    let mut results = Vec::new();
    while let Some(batch) = stream.next().await {
      let batch = batch.map_err(|e| anyhow!("Error reading result batch: {}", e))?;
      collect_recommendations(&batch, &mut results)?;
    }

    Ok(results)
  }

  async fn table_exists(&self) -> Result<bool> {
    let tables = self
      .connection
      .table_names()
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to list tables: {}", e))?;
    Ok(tables.contains(&self.table_name))
  }

  async fn table(&self) -> Result<Table> {
    self
      .connection
      .open_table(&self.table_name)
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to open table '{}': {}", self.table_name, e))
  }
}

/// Assemble one Arrow batch from parallel record/vector slices
fn to_record_batch(records: &[SongRecord], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
  let dim = embeddings[0].len();
  if dim == 0 {
    return Err(anyhow!("Embedding backend produced zero-dimensional vectors"));
  }
  if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
    return Err(anyhow!("Inconsistent embedding dimensions: {} vs {}", bad.len(), dim));
  }

  let schema = Arc::new(Schema::new(vec![
    Field::new("id", DataType::Utf8, false),
    Field::new("title", DataType::Utf8, false),
    Field::new("artist", DataType::Utf8, false),
    Field::new("document", DataType::Utf8, false),
    Field::new(
      "embedding",
      DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32),
      false,
    ),
    Field::new("indexed_at", DataType::Utf8, false),
  ]));

  let indexed_at = Utc::now().to_rfc3339();
  let ids = StringArray::from(records.iter().map(|r| Some(r.id.as_str())).collect::<Vec<_>>());
  let titles =
    StringArray::from(records.iter().map(|r| Some(r.title.as_str())).collect::<Vec<_>>());
  let artists =
    StringArray::from(records.iter().map(|r| Some(r.artist.as_str())).collect::<Vec<_>>());
  let documents =
    StringArray::from(records.iter().map(|r| Some(r.document.as_str())).collect::<Vec<_>>());
  let stamps =
    StringArray::from(records.iter().map(|_| Some(indexed_at.as_str())).collect::<Vec<_>>());

  let mut vectors =
    FixedSizeListBuilder::new(Float32Array::builder(dim * records.len()), dim as i32);
  for embedding in embeddings {
    vectors.values().append_slice(embedding);
    vectors.append(true);
  }

  RecordBatch::try_new(
    schema,
    vec![
      Arc::new(ids),
      Arc::new(titles),
      Arc::new(artists),
      Arc::new(documents),
      Arc::new(vectors.finish()),
      Arc::new(stamps),
    ],
  )
  .map_err(|e| anyhow!("Failed to assemble record batch: {}", e))
}

/// Append every row of a result batch as a [`Recommendation`]
fn collect_recommendations(batch: &RecordBatch, out: &mut Vec<Recommendation>) -> Result<()> {
  let titles = string_column(batch, "title")?;
  let artists = string_column(batch, "artist")?;
  let distances =
    batch.column_by_name("_distance").and_then(|col| col.as_any().downcast_ref::<Float32Array>());

  for i in 0..batch.num_rows() {
    let similarity = match distances {
      Some(array) if !array.is_null(i) => 1.0 - array.value(i),
      _ => 0.0,
    };

    out.push(Recommendation {
      title: titles.value(i).to_string(),
      artist: artists.value(i).to_string(),
      similarity,
    });
  }

  Ok(())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
  batch
    .column_by_name(name)
    .ok_or_else(|| anyhow!("Missing '{}' column", name))?
    .as_any()
    .downcast_ref::<StringArray>()
    .ok_or_else(|| anyhow!("Column '{}' has unexpected type", name))
}
