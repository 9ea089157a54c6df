//! End-to-end ingestion and query tests over a real on-disk index,
//! using the deterministic hash embedder instead of a live Ollama server.

use std::fs;
use std::path::Path;

use anyhow::Result;
use tempfile::TempDir;

use serenade::config::Config;
use serenade::embedding::{Embedder, HashEmbedder};
use serenade::index::SongIndex;
use serenade::ingest;

const TABLE_NAME: &str = "songs";

fn write_csv(dir: &Path, name: &str, content: &str) {
  fs::write(dir.join(name), content).unwrap();
}

fn test_config(songs_dir: &Path, db_dir: &Path, limit: usize) -> Config {
  Config {
    db_dir: db_dir.to_path_buf(),
    songs_dir: songs_dir.to_path_buf(),
    model: "hash".to_string(),
    ollama_host: "http://localhost:11434".to_string(),
    limit,
    top_k: 3,
  }
}

fn two_song_csv() -> &'static str {
  r#"title,artist,lyrics
Eye of the Tiger,Survivor,"Rising up straight to the top, had the guts got the glory"
Someone Like You,Adele,"Never mind I will find someone like you, nothing but tears and heartbreak"
"#
}

#[tokio::test]
async fn test_ingest_then_query_round_trip() -> Result<()> {
  let songs = TempDir::new()?;
  let db = TempDir::new()?;
  write_csv(songs.path(), "songs.csv", two_song_csv());

  let embedder = HashEmbedder::new(256);
  let index = SongIndex::open(db.path(), TABLE_NAME).await?;
  let report = ingest::ingest(&embedder, &index, &test_config(songs.path(), db.path(), 500)).await?;

  assert_eq!(report.indexed, 2);
  assert_eq!(index.count().await?, 2);

  let results =
    serenade::recommend::recommend(&embedder, &index, "rising up to the top guts and glory", 2)
      .await?;

  assert_eq!(results.len(), 2);
  assert_eq!(results[0].title, "Eye of the Tiger");
  assert_eq!(results[0].artist, "Survivor");
  assert!(results[0].similarity > results[1].similarity);

  Ok(())
}

#[tokio::test]
async fn test_same_query_twice_is_idempotent() -> Result<()> {
  let songs = TempDir::new()?;
  let db = TempDir::new()?;
  write_csv(songs.path(), "songs.csv", two_song_csv());

  let embedder = HashEmbedder::new(256);
  let index = SongIndex::open(db.path(), TABLE_NAME).await?;
  ingest::ingest(&embedder, &index, &test_config(songs.path(), db.path(), 500)).await?;

  let first = serenade::recommend::recommend(&embedder, &index, "tears and heartbreak", 2).await?;
  let second = serenade::recommend::recommend(&embedder, &index, "tears and heartbreak", 2).await?;

  assert_eq!(first, second);
  Ok(())
}

#[tokio::test]
async fn test_global_cap_spans_all_sources() -> Result<()> {
  let songs = TempDir::new()?;
  let db = TempDir::new()?;

  // Sources are scanned in sorted path order: a.csv fills first
  write_csv(
    songs.path(),
    "a.csv",
    r#"title,artist,lyrics
First Song,Band A,"some perfectly reasonable lyrics about the road"
Second Song,Band A,"some perfectly reasonable lyrics about the sea"
Third Song,Band A,"some perfectly reasonable lyrics about the sky"
"#,
  );
  write_csv(
    songs.path(),
    "b.csv",
    r#"title,artist,lyrics
Fourth Song,Band B,"some perfectly reasonable lyrics about the rain"
Fifth Song,Band B,"some perfectly reasonable lyrics about the sun"
"#,
  );

  let embedder = HashEmbedder::default();
  let index = SongIndex::open(db.path(), TABLE_NAME).await?;
  let report = ingest::ingest(&embedder, &index, &test_config(songs.path(), db.path(), 4)).await?;

  assert_eq!(report.indexed, 4);
  assert_eq!(report.files_seen, 2);
  assert_eq!(index.count().await?, 4);

  Ok(())
}

#[tokio::test]
async fn test_short_lyrics_rows_are_filtered() -> Result<()> {
  let songs = TempDir::new()?;
  let db = TempDir::new()?;
  write_csv(
    songs.path(),
    "songs.csv",
    r#"title,artist,lyrics
Kept,Band,"these lyrics are comfortably past the minimum length"
Dropped,Band,"too short"
"#,
  );

  let embedder = HashEmbedder::default();
  let index = SongIndex::open(db.path(), TABLE_NAME).await?;
  let report = ingest::ingest(&embedder, &index, &test_config(songs.path(), db.path(), 500)).await?;

  assert_eq!(report.indexed, 1);
  assert_eq!(report.rows_skipped, 1);
  assert_eq!(index.count().await?, 1);

  Ok(())
}

#[tokio::test]
async fn test_unresolvable_header_skips_file_not_run() -> Result<()> {
  let songs = TempDir::new()?;
  let db = TempDir::new()?;
  write_csv(
    songs.path(),
    "bad.csv",
    "release_year,label\n1984,Some Label\n",
  );
  write_csv(
    songs.path(),
    "good.csv",
    r#"track_name,band,text
Fix You,Coldplay,"Lights will guide you home and ignite your bones"
"#,
  );

  let embedder = HashEmbedder::default();
  let index = SongIndex::open(db.path(), TABLE_NAME).await?;
  let report = ingest::ingest(&embedder, &index, &test_config(songs.path(), db.path(), 500)).await?;

  assert_eq!(report.files_seen, 2);
  assert_eq!(report.files_skipped, 1);
  assert_eq!(report.indexed, 1);

  Ok(())
}

#[tokio::test]
async fn test_empty_songs_dir_is_an_error_and_index_stays_empty() -> Result<()> {
  let songs = TempDir::new()?;
  let db = TempDir::new()?;

  let embedder = HashEmbedder::default();
  let index = SongIndex::open(db.path(), TABLE_NAME).await?;
  let result = ingest::ingest(&embedder, &index, &test_config(songs.path(), db.path(), 500)).await;

  assert!(result.is_err());
  assert!(result.unwrap_err().to_string().contains("No CSV files"));
  assert_eq!(index.count().await?, 0);

  // Query against the untouched index: empty result, not an error
  let results = serenade::recommend::recommend(&embedder, &index, "anything at all", 3).await?;
  assert!(results.is_empty());

  Ok(())
}

#[tokio::test]
async fn test_all_rows_filtered_leaves_index_untouched() -> Result<()> {
  let songs = TempDir::new()?;
  let db = TempDir::new()?;
  write_csv(songs.path(), "songs.csv", "title,artist,lyrics\nTiny,Band,short\n");

  let embedder = HashEmbedder::default();
  let index = SongIndex::open(db.path(), TABLE_NAME).await?;
  let report = ingest::ingest(&embedder, &index, &test_config(songs.path(), db.path(), 500)).await?;

  assert_eq!(report.indexed, 0);
  assert_eq!(report.rows_skipped, 1);
  assert_eq!(index.count().await?, 0);

  Ok(())
}

#[tokio::test]
async fn test_add_batch_rejects_count_mismatch() -> Result<()> {
  let db = TempDir::new()?;
  let index = SongIndex::open(db.path(), TABLE_NAME).await?;

  let records = vec![serenade::normalize::SongRecord {
    id: "song_0".to_string(),
    title: "Song".to_string(),
    artist: "Band".to_string(),
    document: "Song: Song. Artist: Band. Context: some lyrics".to_string(),
  }];

  let result = index.add_batch(&records, &[]).await;
  assert!(result.is_err());
  assert_eq!(index.count().await?, 0);

  Ok(())
}

#[tokio::test]
async fn test_search_on_missing_table_returns_empty() -> Result<()> {
  let db = TempDir::new()?;
  let index = SongIndex::open(db.path(), TABLE_NAME).await?;

  let embedder = HashEmbedder::default();
  let query = embedder.embed_query("never indexed anything").await?;
  let results = index.search(&query, 5).await?;

  assert!(results.is_empty());
  Ok(())
}

#[tokio::test]
async fn test_clear_drops_the_collection() -> Result<()> {
  let songs = TempDir::new()?;
  let db = TempDir::new()?;
  write_csv(songs.path(), "songs.csv", two_song_csv());

  let embedder = HashEmbedder::default();
  let index = SongIndex::open(db.path(), TABLE_NAME).await?;
  ingest::ingest(&embedder, &index, &test_config(songs.path(), db.path(), 500)).await?;
  assert_eq!(index.count().await?, 2);

  index.clear().await?;
  assert_eq!(index.count().await?, 0);

  Ok(())
}
