//! Turns raw CSV rows into indexable song records.

use csv::StringRecord;
use thiserror::Error;

use crate::schema::{ResolvedSchema, UNKNOWN_ARTIST};

/// Maximum number of lyrics characters kept in a document
pub const MAX_LYRICS_CHARS: usize = 800;

/// Rows whose truncated lyrics are shorter than this are dropped
pub const MIN_LYRICS_CHARS: usize = 20;

/// One indexable song: a run-unique id, the text handed to the embedding
/// model, and the display metadata carried alongside the vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRecord {
  pub id: String,
  pub title: String,
  pub artist: String,
  pub document: String,
}

/// Why a row was dropped instead of indexed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SkipReason {
  #[error("row has no usable title")]
  MissingTitle,
  #[error("lyrics shorter than {MIN_LYRICS_CHARS} characters")]
  LyricsTooShort,
}

/// Outcome of normalizing a single CSV row
#[derive(Debug, PartialEq, Eq)]
pub enum RowOutcome {
  Song(SongRecord),
  Skip(SkipReason),
}

/// Convert one raw CSV row into a [`SongRecord`].
///
/// `seq` is the run-wide accepted-record counter, threaded through by the
/// pipeline; it becomes part of the id only when the row is accepted.
/// Missing cells coerce to empty strings, so this function never fails;
/// unusable rows come back as [`RowOutcome::Skip`].
///
/// Lyrics keep at most [`MAX_LYRICS_CHARS`] characters from the start of
/// the string, with no ellipsis. The document template below is embedded
/// verbatim at ingestion time and must never be applied to query text.
pub fn normalize(row: &StringRecord, schema: &ResolvedSchema, seq: usize) -> RowOutcome {
  let title = cell(row, Some(schema.title));
  if title.is_empty() {
    return RowOutcome::Skip(SkipReason::MissingTitle);
  }

  let mut artist = cell(row, schema.artist);
  if artist.is_empty() {
    artist = UNKNOWN_ARTIST.to_string();
  }

  let lyrics = truncate_chars(&cell(row, Some(schema.lyrics)), MAX_LYRICS_CHARS);
  if lyrics.chars().count() < MIN_LYRICS_CHARS {
    return RowOutcome::Skip(SkipReason::LyricsTooShort);
  }

  let document = format!("Song: {title}. Artist: {artist}. Context: {lyrics}");

  RowOutcome::Song(SongRecord { id: format!("song_{seq}"), title, artist, document })
}

fn cell(row: &StringRecord, index: Option<usize>) -> String {
  index.and_then(|i| row.get(i)).unwrap_or_default().trim().to_string()
}

/// Keep at most `max` characters from the start of `text`
fn truncate_chars(text: &str, max: usize) -> String {
  text.chars().take(max).collect()
}
