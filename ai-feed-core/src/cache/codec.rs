//! JSON Lines encoding of history entries.
//!
//! One entry per line:
//!
//! ```text
//! {"url":"https://example.com/a","title":"A","posted_at":"2025-01-01T09:00:00Z"}
//! ```
//!
//! Decoding is lenient: blank lines are skipped silently and malformed lines
//! are skipped with a warning. Unknown keys are ignored on read and dropped on
//! the next write.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One posted article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Normalized article URL (identity key)
    pub url: String,
    /// Article title, kept for humans reading the file
    #[serde(default)]
    pub title: String,
    /// When the article was posted; drives retention
    pub posted_at: DateTime<Utc>,
}

/// Outcome of decoding a single line.
#[derive(Debug)]
pub enum DecodedLine {
    Entry(HistoryEntry),
    Blank,
    Malformed(String),
}

/// Decode one line of the history file.
pub fn decode_line(line: &str) -> DecodedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return DecodedLine::Blank;
    }

    match serde_json::from_str::<HistoryEntry>(trimmed) {
        Ok(entry) if entry.url.is_empty() => DecodedLine::Malformed("empty url".to_string()),
        Ok(entry) => DecodedLine::Entry(entry),
        Err(e) => DecodedLine::Malformed(e.to_string()),
    }
}

/// Encode one entry followed by `\n`.
pub fn encode_entry<W: Write>(writer: &mut W, entry: &HistoryEntry) -> Result<()> {
    serde_json::to_writer(&mut *writer, entry)?;
    writer.write_all(b"\n")?;
    Ok(())
}
