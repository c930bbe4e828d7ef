//! Authenticated Musixmatch API calls and the two retrieval strategies built
//! on them.

use std::sync::Arc;

use mxlyrics_core::LyricsResult;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::MusixmatchError;
use crate::format::{format_lyrics, TrackMeta};
use crate::token_manager::TokenManager;
use crate::transport::{Endpoint, Session, Transport};

/// Shared handle used by every strategy task
#[derive(Clone)]
pub struct MusixmatchApi {
    transport: Arc<Transport>,
    tokens: Arc<TokenManager>,
}

impl MusixmatchApi {
    #[must_use]
    pub fn new(transport: Arc<Transport>, tokens: Arc<TokenManager>) -> Self {
        Self { transport, tokens }
    }

    /// Call an endpoint with the current user token.
    ///
    /// An auth rejection (401/403) resets the token, hard when the API asks
    /// for a captcha, and retries once with a freshly fetched one.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt, including a second auth rejection.
    pub async fn call(
        &self,
        endpoint: Endpoint,
        params: &[(&str, Option<&str>)],
    ) -> Result<Value, MusixmatchError> {
        match self.attempt(endpoint, params, false).await {
            Err(e) if e.is_auth() => {
                let hard = e.is_captcha();
                warn!(
                    "Musixmatch rejected {} ({}), retrying with a new token",
                    endpoint.method(),
                    e
                );
                self.tokens.reset_token(hard).await;
                self.attempt(endpoint, params, true).await
            }
            other => other,
        }
    }

    async fn attempt(
        &self,
        endpoint: Endpoint,
        params: &[(&str, Option<&str>)],
        force_token: bool,
    ) -> Result<Value, MusixmatchError> {
        let token = self.tokens.get_token(force_token).await?;

        let mut with_token = params.to_vec();
        with_token.push(("usertoken", Some(token.value.as_str())));

        self.transport
            .get(Session::Cookies, endpoint, &with_token)
            .await
    }

    /// Combined match + lyrics + subtitles lookup in a single request.
    ///
    /// Returns `Ok(None)` when the matched track carries no usable lyrics.
    ///
    /// # Errors
    ///
    /// Propagates the [`MusixmatchError`] of the underlying call.
    pub async fn macro_subtitles(
        &self,
        title: &str,
        artist: Option<&str>,
    ) -> Result<Option<LyricsResult>, MusixmatchError> {
        debug!("Macro lookup: {:?} - {}", artist, title);

        let body = self
            .call(
                Endpoint::MacroSubtitles,
                &[
                    ("format", Some("json")),
                    ("namespace", Some("lyrics_richsynched")),
                    ("subtitle_format", Some("mxm")),
                    ("q_artist", artist),
                    ("q_track", Some(title)),
                ],
            )
            .await?;

        let calls = body.get("macro_calls");
        let lookup = |pointer: &str| {
            calls
                .and_then(|c| c.pointer(pointer))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        };

        let plain = lookup("/track.lyrics.get/message/body/lyrics/lyrics_body");
        let subtitles =
            lookup("/track.subtitles.get/message/body/subtitle_list/0/subtitle/subtitle_body");

        if plain.is_none() && subtitles.is_none() {
            debug!("Macro lookup found no lyrics or subtitles");
            return Ok(None);
        }

        let track = TrackMeta::from_value(
            calls.and_then(|c| c.pointer("/matcher.track.get/message/body/track")),
        );
        let result = format_lyrics(subtitles, plain, track);

        if result.has_lyrics() {
            info!(
                "Macro lookup matched \"{}\" by {}",
                result.track.title, result.track.author
            );
            Ok(Some(result))
        } else {
            debug!("Macro lookup returned only unusable lyrics");
            Ok(None)
        }
    }

    /// Search for the best-rated track, then fetch its synced subtitles.
    ///
    /// Returns `Ok(None)` when nothing matches or the match has no subtitles.
    ///
    /// # Errors
    ///
    /// Propagates the [`MusixmatchError`] of either call.
    pub async fn search_then_fetch(
        &self,
        title: &str,
        artist: Option<&str>,
    ) -> Result<Option<LyricsResult>, MusixmatchError> {
        debug!("Search lookup: {:?} - {}", artist, title);

        let body = self
            .call(
                Endpoint::TrackSearch,
                &[
                    ("page_size", Some("1")),
                    ("page", Some("1")),
                    ("s_track_rating", Some("desc")),
                    ("q_track", Some(title)),
                    ("q_artist", artist),
                ],
            )
            .await?;

        let Some(track) = body
            .pointer("/track_list/0/track")
            .filter(|t| t.is_object())
        else {
            debug!("Search found no track");
            return Ok(None);
        };

        let track_id = track
            .get("track_id")
            .and_then(Value::as_u64)
            .ok_or_else(|| MusixmatchError::Malformed("search result has no track_id".into()))?
            .to_string();

        let body = self
            .call(
                Endpoint::TrackSubtitle,
                &[("subtitle_format", Some("mxm")), ("track_id", Some(track_id.as_str()))],
            )
            .await?;

        let Some(subtitles) = body
            .pointer("/subtitle/subtitle_body")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        else {
            debug!("Track {} has no subtitles", track_id);
            return Ok(None);
        };

        let result = format_lyrics(Some(subtitles), None, TrackMeta::from_value(Some(track)));
        info!(
            "Search matched \"{}\" by {} (track {})",
            result.track.title, result.track.author, track_id
        );
        Ok(Some(result))
    }
}
