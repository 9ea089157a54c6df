//! Interactive prompt loop.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use colored::*;

use crate::embedding::Embedder;
use crate::index::SongIndex;
use crate::recommend;

/// Inputs that leave the loop, matched case-insensitively
const EXIT_WORDS: &[&str] = &["exit", "quit", "salir"];

/// Read mood queries from stdin until EOF or an exit word.
///
/// Failed queries are reported and the loop continues; only stdin errors
/// propagate.
pub async fn run(embedder: &dyn Embedder, index: &SongIndex, top_k: usize) -> Result<()> {
  let stdin = io::stdin();
  let mut line = String::new();

  loop {
    print!("\n{} ", ">>".green().bold());
    io::stdout().flush()?;

    line.clear();
    if stdin.lock().read_line(&mut line)? == 0 {
      break; // EOF
    }

    let query = line.trim();
    if query.is_empty() {
      continue;
    }
    if EXIT_WORDS.iter().any(|w| query.eq_ignore_ascii_case(w)) {
      break;
    }

    match recommend::recommend(embedder, index, query, top_k).await {
      Ok(results) => recommend::render(&results),
      Err(e) => eprintln!("{} {}", "Query failed:".red(), e),
    }
  }

  println!("Bye.");
  Ok(())
}
