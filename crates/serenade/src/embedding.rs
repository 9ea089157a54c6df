//! Embedding backends.
//!
//! Production embeddings come from a local Ollama server. The same model
//! must embed both documents and queries; mixing models puts stored and
//! query vectors in different spaces and the similarity scores stop
//! meaning anything.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Text-to-vector backend shared by ingestion and querying
#[async_trait]
pub trait Embedder: Send + Sync {
  /// Embed a batch of documents for indexing
  async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

  /// Embed a single free-text query
  async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Request payload for Ollama's `/api/embed`
#[derive(Serialize)]
struct EmbedRequest<'a> {
  model: &'a str,
  input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
  embeddings: Vec<Vec<f32>>,
}

/// Client for a local Ollama embedding model
pub struct OllamaEmbedder {
  client: Client,
  host: String,
  model: String,
}

impl OllamaEmbedder {
  /// Build a client for `model` served at `host`. The server is only
  /// contacted lazily, on the first embed call.
  pub fn new(host: &str, model: &str) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS)).build()?;

    Ok(Self {
      client,
      host: host.trim_end_matches('/').to_string(),
      model: model.to_string(),
    })
  }

  async fn embed(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
    let url = format!("{}/api/embed", self.host);
    let request = EmbedRequest { model: &self.model, input };

    let response = self
      .client
      .post(&url)
      .json(&request)
      .send()
      .await
      .map_err(|e| anyhow!("Embedding backend unreachable at {}: {}", self.host, e))?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(anyhow!("Embedding request failed ({status}): {body}"));
    }

    let parsed: EmbedResponse = response.json().await?;
    if parsed.embeddings.len() != input.len() {
      return Err(anyhow!(
        "Embedding backend returned {} vectors for {} inputs",
        parsed.embeddings.len(),
        input.len()
      ));
    }

    Ok(parsed.embeddings)
  }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
  async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
      return Ok(vec![]);
    }
    self.embed(texts).await
  }

  async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
    let input = vec![text.to_string()];
    let mut vectors = self.embed(&input).await?;
    vectors.pop().ok_or_else(|| anyhow!("Embedding backend returned no vector"))
  }
}

/// Deterministic bag-of-words embedder.
///
/// Hashes word tokens into a small fixed number of buckets and
/// L2-normalises the counts, so texts sharing vocabulary land close in
/// cosine space. Used by the integration tests and usable as an offline
/// stand-in when no Ollama server is around.
pub struct HashEmbedder {
  dim: usize,
}

impl HashEmbedder {
  pub fn new(dim: usize) -> Self {
    Self { dim }
  }

  fn embed_one(&self, text: &str) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut vector = vec![0.0f32; self.dim];
    for token in text.split_whitespace() {
      let token = token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
      if token.is_empty() {
        continue;
      }
      let mut hasher = DefaultHasher::new();
      token.hash(&mut hasher);
      vector[(hasher.finish() as usize) % self.dim] += 1.0;
    }

    normalize_vector(vector)
  }
}

impl Default for HashEmbedder {
  fn default() -> Self {
    Self::new(64)
  }
}

#[async_trait]
impl Embedder for HashEmbedder {
  async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    Ok(texts.iter().map(|t| self.embed_one(t)).collect())
  }

  async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
    Ok(self.embed_one(text))
  }
}

/// Scale a vector to unit length; zero vectors pass through unchanged
fn normalize_vector(vector: Vec<f32>) -> Vec<f32> {
  let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
  if magnitude > 0.0 {
    vector.into_iter().map(|x| x / magnitude).collect()
  } else {
    vector
  }
}
