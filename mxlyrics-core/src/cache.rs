use crate::provider::LyricsResult;
use crate::query::ParsedQuery;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Smallest capacity the cache accepts, regardless of configuration
pub const MIN_CACHE_ENTRIES: usize = 10;

/// Normalized lookup key: lowercased, trimmed `artist|title`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn new(artist: Option<&str>, title: &str) -> Self {
        let artist = artist.map(|a| a.trim().to_lowercase()).unwrap_or_default();
        let title = title.trim().to_lowercase();
        Self(format!("{artist}|{title}"))
    }
}

impl From<&ParsedQuery> for CacheKey {
    fn from(query: &ParsedQuery) -> Self {
        Self::new(query.artist.as_deref(), &query.title)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value stored in the cache. `NotFound` remembers lookups that came back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedResult {
    Found(LyricsResult),
    NotFound,
}

impl CachedResult {
    #[must_use]
    pub fn into_option(self) -> Option<LyricsResult> {
        match self {
            Self::Found(result) => Some(result),
            Self::NotFound => None,
        }
    }
}

impl From<Option<LyricsResult>> for CachedResult {
    fn from(result: Option<LyricsResult>) -> Self {
        result.map_or(Self::NotFound, Self::Found)
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedResult,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<CacheKey>,
}

impl CacheState {
    fn remove(&mut self, key: &CacheKey) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}

/// Bounded in-memory lyrics cache with per-entry TTL and first-in-first-out eviction
#[derive(Debug)]
pub struct LyricsCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    max_entries: usize,
}

impl LyricsCache {
    /// Create a cache holding at most `max_entries` entries (never fewer than
    /// [`MIN_CACHE_ENTRIES`]), each living for `ttl` after insertion.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            max_entries: max_entries.max(MIN_CACHE_ENTRIES),
        }
    }

    /// Effective capacity after applying the floor
    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Look up a key. Expired entries are dropped and reported as a miss.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedResult> {
        let mut state = self.state.lock().await;

        let expires_at = state.entries.get(key)?.expires_at;
        if expires_at <= Instant::now() {
            debug!("Cache entry expired: {}", key);
            state.remove(key);
            return None;
        }

        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store a value, evicting the oldest-inserted entry when a new key would
    /// exceed capacity. Re-storing an existing key moves it to the back.
    pub async fn put(&self, key: CacheKey, value: CachedResult) {
        let mut state = self.state.lock().await;

        if state.entries.contains_key(&key) {
            state.remove(&key);
        } else if state.entries.len() >= self.max_entries {
            if let Some(oldest) = state.order.pop_front() {
                debug!("Evicting oldest cache entry: {}", oldest);
                state.entries.remove(&oldest);
            }
        }

        state.order.push_back(key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Number of stored entries, including ones that expired but were not read yet
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.order.clear();
    }
}
