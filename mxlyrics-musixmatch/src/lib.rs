//! Musixmatch lyrics provider using the desktop app API.
//!
//! **WARNING:** This talks to an undocumented API meant for Musixmatch's own
//! desktop client. It may change or start rejecting requests at any time.

pub mod api;
pub mod error;
pub mod format;
pub mod token_manager;
pub mod transport;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use mxlyrics_core::{
    CacheKey, CachedResult, CoreError, LyricsCache, LyricsProvider, LyricsResult,
    MusixmatchConfig, ParsedQuery,
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub use api::MusixmatchApi;
pub use error::MusixmatchError;
pub use token_manager::{Token, TokenManager};
pub use transport::{HttpBackend, ReqwestBackend, Transport};

const PROVIDER_NAME: &str = "musixmatch";

/// Lyrics lookup against Musixmatch with result caching.
///
/// Lookups never fail from the caller's point of view: every error is logged
/// and reported as "no lyrics".
pub struct MusixmatchClient {
    api: MusixmatchApi,
    cache: LyricsCache,
}

impl MusixmatchClient {
    /// Create a client using the real HTTP stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be created.
    pub fn new(config: &MusixmatchConfig) -> Result<Self, CoreError> {
        let backend = ReqwestBackend::new(config.request_timeout(), config.max_retries).map_err(
            |e| CoreError::LyricsProviderFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: e.to_string(),
            },
        )?;
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    /// Create a client on top of an arbitrary HTTP backend
    #[must_use]
    pub fn with_backend(backend: Arc<dyn HttpBackend>, config: &MusixmatchConfig) -> Self {
        let transport = Arc::new(Transport::new(backend));
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&transport),
            config.token_file.clone(),
        ));

        Self {
            api: MusixmatchApi::new(transport, tokens),
            cache: LyricsCache::new(config.cache_ttl(), config.max_cache_entries),
        }
    }

    /// Find lyrics for a free-text query such as `"Artist - Title"`.
    ///
    /// Results, including misses, are cached per normalized artist and title.
    pub async fn find_lyrics(&self, query: &str) -> Option<LyricsResult> {
        info!("Looking up lyrics for {:?}", query);

        let parsed = match ParsedQuery::parse(query) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping lookup: {}", e);
                return None;
            }
        };

        let key = CacheKey::from(&parsed);
        if let Some(cached) = self.cache.get(&key).await {
            info!("Using cached result for {}", key);
            return cached.into_option();
        }

        let result = match self.lookup(&parsed).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Musixmatch lookup for {} failed: {}", key, e);
                None
            }
        };

        info!(
            "Lookup for {} finished, lyrics found: {}",
            key,
            result.is_some()
        );
        self.cache.put(key, CachedResult::from(result.clone())).await;
        result
    }

    /// Drop every cached result, including remembered misses
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        debug!("Cleared Musixmatch result cache");
    }

    async fn lookup(&self, parsed: &ParsedQuery) -> Result<Option<LyricsResult>, MusixmatchError> {
        let title = parsed.title.as_str();

        let result = if let Some(artist) = parsed.artist.as_deref() {
            self.race_strategies(title, artist).await
        } else {
            match self.api.search_then_fetch(title, None).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Title-only search failed: {}", e);
                    None
                }
            }
        };

        if result.is_some() {
            return Ok(result);
        }

        debug!("No result yet, falling back to title-only macro lookup");
        self.api.macro_subtitles(title, None).await
    }

    /// Run the macro and search strategies concurrently and keep the first
    /// one that produces lyrics. The other task is aborted.
    async fn race_strategies(&self, title: &str, artist: &str) -> Option<LyricsResult> {
        let mut tasks = JoinSet::new();

        let api = self.api.clone();
        let (t, a) = (title.to_string(), artist.to_string());
        tasks.spawn(async move { ("macro", api.macro_subtitles(&t, Some(&a)).await) });

        let api = self.api.clone();
        let (t, a) = (title.to_string(), artist.to_string());
        tasks.spawn(async move { ("search", api.search_then_fetch(&t, Some(&a)).await) });

        let mut winner = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((strategy, Ok(Some(result)))) => {
                    debug!("{} strategy won the race", strategy);
                    winner = Some(result);
                    break;
                }
                Ok((strategy, Ok(None))) => debug!("{} strategy found nothing", strategy),
                Ok((strategy, Err(e))) => warn!("{} strategy failed: {}", strategy, e),
                Err(e) => warn!("Strategy task did not complete: {}", e),
            }
        }

        tasks.abort_all();
        // Wait for aborted tasks to be dropped so their requests are released
        while tasks.join_next().await.is_some() {}

        winner
    }
}

#[async_trait]
impl LyricsProvider for MusixmatchClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn find_lyrics(&self, query: &str) -> Option<LyricsResult> {
        Self::find_lyrics(self, query).await
    }
}
