use async_trait::async_trait;

/// A single time-synced lyric line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    /// Offset from the start of the track in milliseconds
    pub offset_ms: u64,
    pub text: String,
}

/// Track metadata reported alongside lyrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub author: String,
    /// Largest album cover the provider offered, if any
    pub album_art_url: Option<String>,
}

/// Lyrics returned by a provider.
///
/// At least one of `text` or `lines` is present on results handed to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsResult {
    /// Plain lyric text, one line per row
    pub text: Option<String>,
    /// Synced lines in provider order
    pub lines: Option<Vec<LyricLine>>,
    pub track: TrackInfo,
    /// Constant provider label (e.g. "Musixmatch")
    pub source: &'static str,
}

impl LyricsResult {
    /// Check if any lyric content is present
    #[must_use]
    pub fn has_lyrics(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
            || self.lines.as_ref().is_some_and(|l| !l.is_empty())
    }

    /// Check if lyrics are synced
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.lines.as_ref().is_some_and(|l| !l.is_empty())
    }
}

/// Trait for lyrics providers
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Look up lyrics for a free-text query such as `"Artist - Title"`.
    ///
    /// Never fails: unreachable or malformed upstream responses are logged by
    /// the provider and reported as `None`.
    async fn find_lyrics(&self, query: &str) -> Option<LyricsResult>;
}
