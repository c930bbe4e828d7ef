//! User token lifecycle management for the Musixmatch desktop API.
//!
//! This module handles:
//! 1. Sliding renewal of a hot in-memory token
//! 2. Reuse of the last token persisted to disk
//! 3. A single coalesced `token.get` fetch shared by concurrent callers
//! 4. Soft and hard resets after auth rejections

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use mxlyrics_core::DurationExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::MusixmatchError;
use crate::transport::{Endpoint, Session, Transport};

/// Lifetime granted to a token on acquisition and on every renewal (55 seconds)
pub const TOKEN_TTL: Duration = Duration::from_secs(55);

/// Minimum time between disk writes of a renewed token (5 seconds)
pub const TOKEN_PERSIST_INTERVAL: Duration = Duration::from_secs(5);

/// A user token and the moment it stops being handed out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    fn expiring_after_ttl(value: String, now: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at: expiry_from(now),
        }
    }
}

fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + TimeDelta::milliseconds(TOKEN_TTL.as_millis_i64())
}

/// On-disk token format
#[derive(Debug, Serialize, Deserialize)]
struct PersistedToken {
    value: String,
    /// Expiry in milliseconds since the Unix epoch
    expires: i64,
}

#[derive(Debug, Default)]
struct TokenState {
    token: Option<Token>,
    last_persist: Option<Instant>,
    /// Set once a token has been obtained through the cookie-less session
    session_established: bool,
    /// Bumped by every hard reset; fetches and writes from an older
    /// generation must not touch the state or the token file
    generation: u64,
    /// Latest background write of a renewed token
    pending_persist: Option<JoinHandle<()>>,
}

type TokenFetch = Shared<BoxFuture<'static, Result<Token, MusixmatchError>>>;

/// Owns the Musixmatch user token.
pub struct TokenManager {
    transport: Arc<Transport>,
    token_file: PathBuf,
    state: Arc<Mutex<TokenState>>,
    in_flight: Mutex<Option<TokenFetch>>,
}

impl TokenManager {
    /// Create a token manager persisting to `token_file`.
    #[must_use]
    pub fn new(transport: Arc<Transport>, token_file: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            token_file: token_file.into(),
            state: Arc::new(Mutex::new(TokenState::default())),
            in_flight: Mutex::new(None),
        }
    }

    /// Get a valid token.
    ///
    /// Without `force`, a live in-memory token has its expiry pushed out by
    /// [`TOKEN_TTL`] and is returned without a network call; with no token in
    /// memory the persisted file is tried next. Otherwise a new token is fetched.
    ///
    /// # Errors
    ///
    /// Returns the [`MusixmatchError`] of a failed `token.get` call. Failures
    /// are not retried here.
    pub async fn get_token(&self, force: bool) -> Result<Token, MusixmatchError> {
        if !force {
            let mut state = self.state.lock().await;
            let now = Utc::now();

            let renewed = match state.token.as_mut() {
                Some(token) if now < token.expires_at => {
                    token.expires_at = expiry_from(now);
                    Some(token.clone())
                }
                _ => None,
            };

            if let Some(token) = renewed {
                if state
                    .last_persist
                    .map_or(true, |at| at.elapsed() >= TOKEN_PERSIST_INTERVAL)
                {
                    state.last_persist = Some(Instant::now());
                    let generation = state.generation;
                    let shared = Arc::clone(&self.state);
                    let path = self.token_file.clone();
                    let persisted = token.clone();
                    state.pending_persist = Some(tokio::spawn(async move {
                        let state = shared.lock().await;
                        if state.generation == generation {
                            persist_token(&path, &persisted).await;
                        } else {
                            debug!("Skipping write of a token renewed before a session reset");
                        }
                    }));
                }
                return Ok(token);
            }

            if state.token.is_none() {
                if let Some(token) = read_token_file(&self.token_file).await {
                    info!("Reusing persisted Musixmatch user token");
                    state.token = Some(token.clone());
                    return Ok(token);
                }
            }
        }

        self.acquire().await
    }

    /// Forget the current token.
    ///
    /// A hard reset also deletes the persisted token and clears the session
    /// cookies, for rejections (captcha challenges) that invalidate the session.
    pub async fn reset_token(&self, hard: bool) {
        let pending = {
            let mut state = self.state.lock().await;
            state.token = None;
            if hard {
                state.generation += 1;
                state.session_established = false;
                // Token file writes hold the state lock, so none can land
                // between the generation bump and this removal
                match tokio::fs::remove_file(&self.token_file).await {
                    Ok(()) => debug!("Removed persisted token at {:?}", self.token_file),
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => warn!("Failed to remove persisted token {:?}: {}", self.token_file, e),
                }
                state.pending_persist.take()
            } else {
                None
            }
        };
        *self.in_flight.lock().await = None;

        if !hard {
            debug!("Invalidated cached Musixmatch user token");
            return;
        }

        // A queued renewal write sees the new generation and skips
        if let Some(task) = pending {
            let _ = task.await;
        }
        self.transport.clear_cookies().await;
        info!("Hard reset of Musixmatch session");
    }

    /// The token currently held in memory, without renewing it
    #[cfg(test)]
    pub(crate) async fn current_token(&self) -> Option<Token> {
        self.state.lock().await.token.clone()
    }

    /// Wait for the latest background write of a renewed token
    #[cfg(test)]
    async fn wait_for_persist(&self) {
        let pending = self.state.lock().await.pending_persist.take();
        if let Some(task) = pending {
            let _ = task.await;
        }
    }

    /// Join the in-flight fetch or start a new one.
    async fn acquire(&self) -> Result<Token, MusixmatchError> {
        let fetch = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(fetch) = in_flight.as_ref() {
                debug!("Joining in-flight token fetch");
                fetch.clone()
            } else {
                let fetch = self.start_fetch();
                *in_flight = Some(fetch.clone());
                fetch
            }
        };

        let result = fetch.clone().await;

        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_ref().is_some_and(|f| f.ptr_eq(&fetch)) {
            *in_flight = None;
        }

        result
    }

    fn start_fetch(&self) -> TokenFetch {
        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);
        let token_file = self.token_file.clone();

        async move {
            let (session, generation) = {
                let state = state.lock().await;
                let session = if state.session_established {
                    Session::Cookies
                } else {
                    Session::Stateless
                };
                (session, state.generation)
            };

            info!("Requesting new Musixmatch user token");
            let body = transport.get(session, Endpoint::Token, &[]).await?;

            let value = body
                .get("user_token")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| MusixmatchError::Malformed("token.get returned no user_token".into()))?;

            let token = Token::expiring_after_ttl(value.to_string(), Utc::now());
            let mut state = state.lock().await;
            if state.generation != generation {
                debug!("Discarding token fetched before a session reset");
                return Ok(token);
            }
            state.token = Some(token.clone());
            state.session_established = true;
            state.last_persist = Some(Instant::now());
            persist_token(&token_file, &token).await;
            drop(state);

            info!("Obtained Musixmatch user token");
            Ok(token)
        }
        .boxed()
        .shared()
    }
}

/// Load a persisted token if it is readable and not yet expired
async fn read_token_file(path: &Path) -> Option<Token> {
    let content = tokio::fs::read_to_string(path).await.ok()?;

    let persisted: PersistedToken = match serde_json::from_str(&content) {
        Ok(persisted) => persisted,
        Err(e) => {
            debug!("Ignoring unreadable token file {:?}: {}", path, e);
            return None;
        }
    };

    let expires_at = DateTime::from_timestamp_millis(persisted.expires)?;
    if persisted.value.is_empty() || expires_at <= Utc::now() {
        debug!("Persisted token at {:?} is expired or empty", path);
        return None;
    }

    Some(Token {
        value: persisted.value,
        expires_at,
    })
}

async fn persist_token(path: &Path, token: &Token) {
    let persisted = PersistedToken {
        value: token.value.clone(),
        expires: token.expires_at.timestamp_millis(),
    };

    let json = match serde_json::to_string(&persisted) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize token: {}", e);
            return;
        }
    };

    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            warn!("Failed to create token directory {:?}: {}", parent, e);
            return;
        }
    }

    if let Err(e) = tokio::fs::write(path, json).await {
        warn!("Failed to persist token to {:?}: {}", path, e);
    }
}
