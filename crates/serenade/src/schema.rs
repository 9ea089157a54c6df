//! Maps arbitrary CSV headers onto the logical song fields.

use csv::StringRecord;

/// Accepted header spellings per logical field, lowercase
const TITLE_SYNONYMS: &[&str] = &["title", "song", "song_name", "track", "track_name", "name"];
const ARTIST_SYNONYMS: &[&str] = &["artist", "artist_name", "band", "singer", "performer"];
const LYRICS_SYNONYMS: &[&str] = &["lyrics", "lyric", "letra", "text", "song_text"];

/// Fallback artist for tables without a resolvable artist column
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Column indices of the logical song fields within one CSV header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
  pub title: usize,
  pub artist: Option<usize>,
  pub lyrics: usize,
}

/// Identify the title/artist/lyrics columns of a header row.
///
/// Column names are whitespace-trimmed and lowercased, then compared for
/// exact membership in the field's synonym set, scanning the header left
/// to right; the first matching column wins. Each field resolves
/// independently. Title and lyrics are mandatory; `None` means the whole
/// source should be skipped. A missing artist column is not an error and
/// falls back to [`UNKNOWN_ARTIST`] per record.
pub fn resolve(headers: &StringRecord) -> Option<ResolvedSchema> {
  let title = find_column(headers, TITLE_SYNONYMS)?;
  let lyrics = find_column(headers, LYRICS_SYNONYMS)?;
  let artist = find_column(headers, ARTIST_SYNONYMS);

  Some(ResolvedSchema { title, artist, lyrics })
}

fn find_column(headers: &StringRecord, synonyms: &[&str]) -> Option<usize> {
  headers.iter().position(|name| synonyms.contains(&name.trim().to_lowercase().as_str()))
}
