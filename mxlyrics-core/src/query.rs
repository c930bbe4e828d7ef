//! Free-text query parsing into an artist/title pair.
//!
//! The split is a heuristic: a bare hyphen inside an artist name (e.g.
//! "Jay-Z Empire State") splits on the wrong hyphen when no spaced separator
//! is present.

use crate::error::{CoreError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Bracketed annotations such as `[Official Video]` or `[Lyrics]`
#[allow(clippy::expect_used)]
static BRACKET_JUNK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*\[[^\]]*(?:official|lyrics?|video|audio|mv|visualizer|color\s*coded|hd|4k)[^\]]*\]",
    )
    .expect("bracket junk pattern is valid")
});

/// Artist/title separators in priority order
pub const SEPARATORS: [&str; 5] = [" - ", " – ", " — ", " ~ ", "-"];

/// A search string split into its artist and title parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub artist: Option<String>,
    /// Never empty
    pub title: String,
}

impl ParsedQuery {
    /// Parse a raw search string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyQuery`] if nothing is left once bracketed
    /// annotations and surrounding whitespace are removed.
    pub fn parse(raw: &str) -> Result<Self> {
        let cleaned = BRACKET_JUNK.replace_all(raw, "");
        let cleaned = cleaned.trim();

        if cleaned.is_empty() {
            return Err(CoreError::EmptyQuery {
                raw: raw.to_string(),
            });
        }

        for separator in SEPARATORS {
            // Only the first occurrence of each separator is considered
            if let Some((artist, title)) = cleaned.split_once(separator) {
                let (artist, title) = (artist.trim(), title.trim());
                if !artist.is_empty() && !title.is_empty() {
                    return Ok(Self {
                        artist: Some(artist.to_string()),
                        title: title.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            artist: None,
            title: cleaned.to_string(),
        })
    }
}
