use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

mod config;
mod embedding;
mod index;
mod ingest;
mod normalize;
mod recommend;
mod repl;
mod schema;

use config::Config;
use embedding::OllamaEmbedder;
use index::SongIndex;
use ingest::IngestReport;

const TABLE_NAME: &str = "songs";

#[derive(Parser)]
#[command(name = "serenade")]
#[command(
  about = "Serenade - Semantic Song Recommendations\nIndexes lyrics datasets and matches songs to moods"
)]
#[command(version)]
struct Cli {
  #[command(flatten)]
  options: SharedOptions,
  #[command(subcommand)]
  command: Option<Commands>,
}

/// Flags shared by every subcommand
#[derive(Args)]
struct SharedOptions {
  /// Directory holding the persistent vector index
  #[arg(long, global = true)]
  db_dir: Option<PathBuf>,
  /// Directory scanned for song CSV files
  #[arg(long, global = true)]
  songs_dir: Option<PathBuf>,
  /// Ollama embedding model (must stay constant across index and query)
  #[arg(long, global = true)]
  model: Option<String>,
  /// Base URL of the Ollama server
  #[arg(long, global = true)]
  ollama_host: Option<String>,
  /// Maximum number of songs ingested per run
  #[arg(long, global = true)]
  limit: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
  /// Ingest CSV sources into the vector index
  Index {
    /// Drop the existing collection and re-ingest from scratch
    #[arg(short, long)]
    force: bool,
  },
  /// Ask for recommendations once and exit
  Ask {
    /// Number of recommendations to return
    #[arg(short = 'k', long, default_value_t = 3)]
    top_k: usize,
    /// Mood or situation to match songs against
    #[arg(required = true)]
    query: Vec<String>,
  },
  /// Interactive recommendation prompt
  Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let cli = Cli::parse();
  let config = build_config(&cli.options);

  let index = SongIndex::open(&config.db_dir, TABLE_NAME).await?;
  let embedder = OllamaEmbedder::new(&config.ollama_host, &config.model)?;

  match cli.command {
    Some(Commands::Index { force }) => run_index(&embedder, &index, &config, force).await,
    Some(Commands::Ask { top_k, query }) => {
      run_ask(&embedder, &index, &query.join(" "), top_k).await
    }
    Some(Commands::Chat) => repl::run(&embedder, &index, config.top_k).await,
    None => run_default(&embedder, &index, &config).await,
  }
}

/// Apply CLI flags on top of env-resolved defaults
fn build_config(options: &SharedOptions) -> Config {
  let mut config = Config::default();

  if let Some(db_dir) = &options.db_dir {
    config.db_dir = db_dir.clone();
  }
  if let Some(songs_dir) = &options.songs_dir {
    config.songs_dir = songs_dir.clone();
  }
  if let Some(model) = &options.model {
    config.model = model.clone();
  }
  if let Some(ollama_host) = &options.ollama_host {
    config.ollama_host = ollama_host.clone();
  }
  if let Some(limit) = options.limit {
    config.limit = limit;
  }

  config
}

async fn run_index(
  embedder: &OllamaEmbedder,
  index: &SongIndex,
  config: &Config,
  force: bool,
) -> Result<()> {
  if force {
    index.clear().await?;
  } else if index.count().await? > 0 {
    println!("{} Index already contains songs; use --force to rebuild", "i".blue());
    return Ok(());
  }

  let report = ingest::ingest(embedder, index, config).await?;
  print_report(&report);
  Ok(())
}

async fn run_ask(
  embedder: &OllamaEmbedder,
  index: &SongIndex,
  query: &str,
  top_k: usize,
) -> Result<()> {
  let results = recommend::recommend(embedder, index, query, top_k).await?;
  recommend::render(&results);
  Ok(())
}

/// Default flow: ingest only when the collection is empty, then drop into
/// the prompt loop. A failed ingestion is reported and the loop still
/// starts, just over an empty index.
async fn run_default(embedder: &OllamaEmbedder, index: &SongIndex, config: &Config) -> Result<()> {
  if index.count().await? == 0 {
    match ingest::ingest(embedder, index, config).await {
      Ok(report) => print_report(&report),
      Err(e) => eprintln!("{} {} (continuing with an empty index)", "!".yellow(), e),
    }
  } else {
    println!("{} Index loaded.", "i".blue());
  }

  repl::run(embedder, index, config.top_k).await
}

fn print_report(report: &IngestReport) {
  println!(
    "{} Indexed {} songs from {} files ({} rows skipped, {} files skipped)",
    "✓".green(),
    report.indexed,
    report.files_seen - report.files_skipped,
    report.rows_skipped,
    report.files_skipped,
  );
}
