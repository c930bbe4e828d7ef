//! Scripted [`HttpBackend`] for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use crate::error::MusixmatchError;
use crate::transport::{HttpBackend, RawResponse, Session};

/// Canned response for a single request
pub enum Reply {
    /// HTTP 200 with the given body
    Body(String),
    /// HTTP 200 after sleeping
    Delayed(Duration, String),
    /// Never answers; the flag is raised when the request is dropped
    Pending(Arc<AtomicBool>),
    /// Connection-level failure
    ConnectionError,
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Self::Body(body)
    }
}

type Handler = Box<dyn Fn(&Url) -> Reply + Send + Sync>;

pub struct ScriptedBackend {
    handler: Handler,
    delay: Option<Duration>,
    requests: Mutex<Vec<(Session, Url)>>,
    cookie_clears: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new<F, R>(handler: F) -> Arc<Self>
    where
        F: Fn(&Url) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        Arc::new(Self::build(None, handler))
    }

    /// Like [`ScriptedBackend::new`], delaying every reply
    pub fn with_delay<F, R>(delay: Duration, handler: F) -> Arc<Self>
    where
        F: Fn(&Url) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        Arc::new(Self::build(Some(delay), handler))
    }

    fn build<F, R>(delay: Option<Duration>, handler: F) -> Self
    where
        F: Fn(&Url) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        Self {
            handler: Box::new(move |url| handler(url).into()),
            delay,
            requests: Mutex::new(Vec::new()),
            cookie_clears: AtomicUsize::new(0),
        }
    }

    /// Number of requests made to an API method
    pub fn count(&self, api_method: &str) -> usize {
        self.sessions(api_method).len()
    }

    /// Sessions used by each request to an API method, in order
    pub fn sessions(&self, api_method: &str) -> Vec<Session> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, url)| method(url) == api_method)
            .map(|(session, _)| *session)
            .collect()
    }

    /// All requests made to an API method
    pub fn urls(&self, api_method: &str) -> Vec<Url> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, url)| method(url) == api_method)
            .map(|(_, url)| url.clone())
            .collect()
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn cookie_clears(&self) -> usize {
        self.cookie_clears.load(Ordering::SeqCst)
    }
}

struct RaiseOnDrop(Arc<AtomicBool>);

impl Drop for RaiseOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpBackend for ScriptedBackend {
    async fn get(&self, session: Session, url: Url) -> Result<RawResponse, MusixmatchError> {
        self.requests.lock().unwrap().push((session, url.clone()));
        let reply = (self.handler)(&url);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let body = match reply {
            Reply::Body(body) => body,
            Reply::Delayed(delay, body) => {
                tokio::time::sleep(delay).await;
                body
            }
            Reply::Pending(flag) => {
                let _guard = RaiseOnDrop(flag);
                return std::future::pending().await;
            }
            Reply::ConnectionError => {
                return Err(MusixmatchError::Transport {
                    status: 0,
                    reason: "connection refused".into(),
                })
            }
        };

        Ok(RawResponse { status: 200, body })
    }

    async fn clear_cookies(&self) {
        self.cookie_clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Last path segment of a request URL, e.g. `track.search`
pub fn method(url: &Url) -> &str {
    url.path().rsplit('/').next().unwrap_or_default()
}

/// Value of a query parameter
pub fn param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Serialized API envelope with the given header status and body
pub fn envelope(status_code: u16, body: Value) -> String {
    json!({
        "message": {
            "header": {"status_code": status_code},
            "body": body
        }
    })
    .to_string()
}

/// Serialized API error envelope carrying a hint
pub fn error_envelope(status_code: u16, hint: &str) -> String {
    json!({
        "message": {
            "header": {"status_code": status_code, "hint": hint},
            "body": ""
        }
    })
    .to_string()
}
