//! Conversion of raw Musixmatch payloads into [`LyricsResult`]s.

use mxlyrics_core::time::secs_f64_to_millis;
use mxlyrics_core::{LyricLine, LyricsResult, TrackInfo};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Provider label attached to every result
pub const SOURCE: &str = "Musixmatch";

/// Inline `[mm:ss]` / `[mm:ss.fff]` markers in plain lyrics
#[allow(clippy::expect_used)]
static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d{1,2}:\d{2}(?:\.\d{1,3})?\]").expect("timestamp pattern is valid")
});

/// Track fields read from search and matcher responses.
/// The API returns many more fields; serde ignores unknown fields by default.
#[derive(Debug, Default, Deserialize)]
pub struct TrackMeta {
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    album_coverart_800x800: Option<String>,
    #[serde(default)]
    album_coverart_500x500: Option<String>,
    #[serde(default)]
    album_coverart_350x350: Option<String>,
    #[serde(default)]
    album_coverart_100x100: Option<String>,
}

impl TrackMeta {
    /// Read track metadata from a JSON `track` object. Anything unreadable
    /// yields empty metadata.
    #[must_use]
    pub fn from_value(track: Option<&Value>) -> Self {
        track
            .and_then(|t| Self::deserialize(t).ok())
            .unwrap_or_default()
    }

    /// Largest non-empty album cover
    fn album_art(&self) -> Option<String> {
        [
            &self.album_coverart_800x800,
            &self.album_coverart_500x500,
            &self.album_coverart_350x350,
            &self.album_coverart_100x100,
        ]
        .into_iter()
        .flatten()
        .find(|url| !url.is_empty())
        .cloned()
    }

    fn into_track_info(self) -> TrackInfo {
        TrackInfo {
            album_art_url: self.album_art(),
            title: self.track_name.unwrap_or_default(),
            author: self.artist_name.unwrap_or_default(),
        }
    }
}

/// Build a result from a subtitle payload and/or plain lyrics.
///
/// Plain lyrics take precedence for `text`; without them the synced lines are
/// joined instead.
#[must_use]
pub fn format_lyrics(subtitles: Option<&str>, plain: Option<&str>, track: TrackMeta) -> LyricsResult {
    let lines = subtitles.and_then(parse_subtitles);
    let text = plain.map(clean_lyrics).or_else(|| {
        lines.as_ref().map(|lines| {
            lines
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
    });

    LyricsResult {
        text,
        lines,
        track: track.into_track_info(),
        source: SOURCE,
    }
}

/// Parse an `mxm` subtitle body: either a JSON array of entries or an object
/// with a `subtitle` array. Entry order is kept as-is.
///
/// Returns `None` for unparseable or empty payloads.
#[must_use]
pub fn parse_subtitles(raw: &str) -> Option<Vec<LyricLine>> {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            debug!("Unparseable subtitle body: {}", e);
            return None;
        }
    };

    let entries = match &parsed {
        Value::Array(entries) => entries,
        Value::Object(object) => object.get("subtitle")?.as_array()?,
        _ => return None,
    };

    if entries.is_empty() {
        return None;
    }

    Some(
        entries
            .iter()
            .map(|entry| LyricLine {
                offset_ms: secs_f64_to_millis(
                    entry
                        .pointer("/time/total")
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0),
                ),
                text: match entry.get("text") {
                    Some(Value::String(text)) => text.clone(),
                    None | Some(Value::Null) => String::new(),
                    Some(other) => other.to_string(),
                },
            })
            .collect(),
    )
}

/// Strip inline timestamps, trim each line and drop blank ones
#[must_use]
pub fn clean_lyrics(raw: &str) -> String {
    TIMESTAMP
        .replace_all(raw, "")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
