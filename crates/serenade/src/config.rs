use std::env;
use std::path::PathBuf;

/// Ollama model used for both document and query embeddings
pub const DEFAULT_MODEL: &str = "gemma:2b";

/// Base URL of the local Ollama server
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Runtime configuration, resolved from defaults, environment overrides
/// and CLI flags (in that order of increasing precedence)
#[derive(Debug, Clone)]
pub struct Config {
  /// Directory holding the persistent vector index
  pub db_dir: PathBuf,
  /// Directory scanned for song CSV files
  pub songs_dir: PathBuf,
  /// Embedding model name; must stay constant across index and query
  pub model: String,
  /// Ollama server base URL
  pub ollama_host: String,
  /// Global cap on accepted records per ingestion run
  pub limit: usize,
  /// Default number of recommendations per query
  pub top_k: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      db_dir: env_path("SERENADE_DB_DIR", "./serenade_db"),
      songs_dir: env_path("SERENADE_SONGS_DIR", "./songs"),
      model: env::var("SERENADE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
      ollama_host: env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string()),
      limit: 500,
      top_k: 3,
    }
  }
}

fn env_path(var: &str, fallback: &str) -> PathBuf {
  env::var(var).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(fallback))
}
