//! Query service: free text in, ranked songs out.

use anyhow::Result;
use colored::*;

use crate::embedding::Embedder;
use crate::index::{Recommendation, SongIndex};

/// Embed `text` and rank the `k` nearest stored songs.
///
/// The query string is embedded as-is; the ingestion document template is
/// never applied to queries. An empty index yields an empty list, not an
/// error.
pub async fn recommend(
  embedder: &dyn Embedder,
  index: &SongIndex,
  text: &str,
  k: usize,
) -> Result<Vec<Recommendation>> {
  if index.count().await? == 0 {
    return Ok(vec![]);
  }

  let query = embedder.embed_query(text).await?;
  index.search(&query, k).await
}

/// Print a ranked recommendation list
pub fn render(results: &[Recommendation]) {
  if results.is_empty() {
    println!("{}", "No matches found.".yellow());
    return;
  }

  for (rank, result) in results.iter().enumerate() {
    println!(
      "{}. {} - {} {}",
      rank + 1,
      result.title.cyan().bold(),
      result.artist.yellow(),
      format!("(similarity {:.2})", result.similarity).dimmed()
    );
  }
}
