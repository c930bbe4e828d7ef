//! HTTP transport for the Musixmatch desktop API.
//!
//! Every response is wrapped in a `{message: {header: {status_code, hint}, body}}`
//! envelope regardless of the HTTP status, so decoding the envelope is part of
//! the transport contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use const_format::concatcp;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::error::MusixmatchError;

/// Base URL of the desktop API
pub const API_BASE_URL: &str = "https://apic-desktop.musixmatch.com/ws/1.1/";

/// Application identifier attached to every request
pub const APP_ID: &str = "web-desktop-app-v1.0";

/// User agent for requests
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Upper bound for the TCP connect phase; the overall request timeout still applies
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// API endpoints used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Token,
    TrackSearch,
    TrackSubtitle,
    MacroSubtitles,
}

impl Endpoint {
    #[must_use]
    pub const fn url(self) -> &'static str {
        match self {
            Self::Token => concatcp!(API_BASE_URL, "token.get"),
            Self::TrackSearch => concatcp!(API_BASE_URL, "track.search"),
            Self::TrackSubtitle => concatcp!(API_BASE_URL, "track.subtitle.get"),
            Self::MacroSubtitles => concatcp!(API_BASE_URL, "macro.subtitles.get"),
        }
    }

    /// Method name as it appears in the URL path
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::Token => "token.get",
            Self::TrackSearch => "track.search",
            Self::TrackSubtitle => "track.subtitle.get",
            Self::MacroSubtitles => "macro.subtitles.get",
        }
    }
}

/// Which HTTP session a request goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    /// Persists cookies across calls; the API ties some state to them
    Cookies,
    /// No cookie jar; used before any session identity exists
    Stateless,
}

/// Status and body of an HTTP response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Raw HTTP GET capability behind the transport.
///
/// Implementations report connectivity failures and timeouts as
/// [`MusixmatchError::Transport`] with status 0 and return every received
/// response, whatever its status, as a [`RawResponse`].
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn get(&self, session: Session, url: Url) -> Result<RawResponse, MusixmatchError>;

    /// Drop all cookies held by the cookie session
    async fn clear_cookies(&self);
}

/// `reqwest` backend owning a stateless client and a cookie-bearing client
pub struct ReqwestBackend {
    stateless: ClientWithMiddleware,
    cookies: RwLock<ClientWithMiddleware>,
    timeout: Duration,
    max_retries: u32,
}

impl ReqwestBackend {
    /// Create both sessions.
    ///
    /// # Errors
    ///
    /// Returns [`MusixmatchError::ClientBuild`] if an HTTP client cannot be created.
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self, MusixmatchError> {
        Ok(Self {
            stateless: build_client(timeout, max_retries, None)?,
            cookies: RwLock::new(build_client(
                timeout,
                max_retries,
                Some(Arc::new(Jar::default())),
            )?),
            timeout,
            max_retries,
        })
    }
}

fn build_client(
    timeout: Duration,
    max_retries: u32,
    jar: Option<Arc<Jar>>,
) -> Result<ClientWithMiddleware, MusixmatchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .user_agent(USER_AGENT)
        .default_headers(headers);

    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }

    let base_client = builder
        .build()
        .map_err(|e| MusixmatchError::ClientBuild(e.to_string()))?;

    // Wrap with retry middleware (exponential backoff) for transient failures
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
    Ok(ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get(&self, session: Session, url: Url) -> Result<RawResponse, MusixmatchError> {
        let client = match session {
            Session::Stateless => self.stateless.clone(),
            Session::Cookies => self.cookies.read().await.clone(),
        };

        let response = client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }

    async fn clear_cookies(&self) {
        // The cookie jar cannot be emptied in place, so the session gets a new one
        match build_client(self.timeout, self.max_retries, Some(Arc::new(Jar::default()))) {
            Ok(client) => {
                *self.cookies.write().await = client;
                debug!("Cleared Musixmatch session cookies");
            }
            Err(e) => warn!("Failed to reset cookie session, keeping old cookies: {}", e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    message: EnvelopeMessage,
}

#[derive(Debug, Deserialize)]
struct EnvelopeMessage {
    header: EnvelopeHeader,
    #[serde(default)]
    body: Value,
}

#[derive(Debug, Deserialize)]
struct EnvelopeHeader {
    status_code: i64,
    #[serde(default)]
    hint: Option<String>,
}

/// Issues API requests and unwraps the response envelope
pub struct Transport {
    backend: Arc<dyn HttpBackend>,
}

impl Transport {
    #[must_use]
    pub fn new(backend: Arc<dyn HttpBackend>) -> Self {
        Self { backend }
    }

    /// GET an endpoint and return the envelope body.
    ///
    /// `app_id` is always attached; parameters whose value is `None` are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`MusixmatchError::Transport`] for connectivity failures and
    /// non-2xx responses without an envelope, [`MusixmatchError::Api`] when the
    /// envelope status is not 200, and [`MusixmatchError::Malformed`] for
    /// unreadable 2xx bodies.
    pub async fn get(
        &self,
        session: Session,
        endpoint: Endpoint,
        params: &[(&str, Option<&str>)],
    ) -> Result<Value, MusixmatchError> {
        let url = build_url(endpoint, params)?;
        debug!("Musixmatch GET {} ({:?} session)", endpoint.method(), session);

        let response = self.backend.get(session, url).await?;
        debug!("Musixmatch {} response status: {}", endpoint.method(), response.status);

        decode_envelope(&response)
    }

    /// Drop the cookie session's cookies
    pub async fn clear_cookies(&self) {
        self.backend.clear_cookies().await;
    }
}

fn build_url(endpoint: Endpoint, params: &[(&str, Option<&str>)]) -> Result<Url, MusixmatchError> {
    let query = params
        .iter()
        .filter_map(|&(key, value)| value.map(|v| (key, v)))
        .chain(std::iter::once(("app_id", APP_ID)));

    Url::parse_with_params(endpoint.url(), query)
        .map_err(|e| MusixmatchError::InvalidUrl(e.to_string()))
}

fn decode_envelope(response: &RawResponse) -> Result<Value, MusixmatchError> {
    let http_ok = (200..300).contains(&response.status);

    let envelope = match serde_json::from_str::<Envelope>(&response.body) {
        Ok(envelope) => envelope,
        Err(e) if http_ok => return Err(MusixmatchError::Malformed(e.to_string())),
        Err(_) => {
            return Err(MusixmatchError::Transport {
                status: response.status,
                reason: format!("HTTP {}", response.status),
            })
        }
    };

    let header = envelope.message.header;
    if header.status_code != 200 {
        return Err(MusixmatchError::Api {
            code: u16::try_from(header.status_code).unwrap_or(0),
            hint: header.hint.filter(|h| !h.is_empty()),
        });
    }

    if !http_ok {
        return Err(MusixmatchError::Transport {
            status: response.status,
            reason: format!("HTTP {} with successful envelope", response.status),
        });
    }

    Ok(envelope.message.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_endpoint_urls() {
        assert_eq!(
            Endpoint::Token.url(),
            "https://apic-desktop.musixmatch.com/ws/1.1/token.get"
        );
        assert_eq!(
            Endpoint::MacroSubtitles.url(),
            "https://apic-desktop.musixmatch.com/ws/1.1/macro.subtitles.get"
        );
    }

    #[test]
    fn test_build_url_skips_absent_params() {
        let url = build_url(
            Endpoint::TrackSearch,
            &[("q_track", Some("Never Gonna Give You Up")), ("q_artist", None)],
        )
        .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("q_track".to_string(), "Never Gonna Give You Up".to_string()),
                ("app_id".to_string(), APP_ID.to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_success_returns_body() {
        let body = json!({"message": {"header": {"status_code": 200}, "body": {"user_token": "abc"}}});
        let value = decode_envelope(&raw(200, &body.to_string())).unwrap();
        assert_eq!(value, json!({"user_token": "abc"}));
    }

    #[test]
    fn test_decode_api_error_with_hint() {
        let body = json!({"message": {"header": {"status_code": 401, "hint": "captcha"}, "body": ""}});
        let err = decode_envelope(&raw(200, &body.to_string())).unwrap_err();
        assert!(matches!(
            err,
            MusixmatchError::Api { code: 401, hint: Some(ref h) } if h == "captcha"
        ));
    }

    #[test]
    fn test_decode_non_2xx_with_envelope_is_api_error() {
        let body = json!({"message": {"header": {"status_code": 404}, "body": []}});
        let err = decode_envelope(&raw(404, &body.to_string())).unwrap_err();
        assert!(matches!(err, MusixmatchError::Api { code: 404, hint: None }));
    }

    #[test]
    fn test_decode_non_2xx_without_envelope_is_transport_error() {
        let err = decode_envelope(&raw(503, "<html>Service Unavailable</html>")).unwrap_err();
        assert!(matches!(err, MusixmatchError::Transport { status: 503, .. }));
    }

    #[test]
    fn test_decode_garbage_2xx_is_malformed() {
        let err = decode_envelope(&raw(200, "not json")).unwrap_err();
        assert!(matches!(err, MusixmatchError::Malformed(_)));
    }

    mod reqwest_backend {
        use super::*;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;
        use tokio::sync::mpsc;

        const OK_BODY: &str = r#"{"message":{"header":{"status_code":200},"body":{"user_token":"t"}}}"#;

        /// Serve canned envelopes, reporting each request head in lowercase
        async fn spawn_server() -> (Url, mpsc::UnboundedReceiver<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let (tx, rx) = mpsc::unbounded_channel();

            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let mut head = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        let n = socket.read(&mut chunk).await.unwrap();
                        if n == 0 {
                            break;
                        }
                        head.extend_from_slice(&chunk[..n]);
                    }
                    let _ = tx.send(String::from_utf8_lossy(&head).to_lowercase());

                    let response = format!(
                        "HTTP/1.1 200 OK\r\n\
                         content-type: application/json\r\n\
                         set-cookie: mxm_session=abc; Path=/\r\n\
                         content-length: {}\r\n\
                         connection: close\r\n\r\n{}",
                        OK_BODY.len(),
                        OK_BODY
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                }
            });

            let url = Url::parse(&format!("http://{addr}/ws/1.1/token.get?app_id={APP_ID}")).unwrap();
            (url, rx)
        }

        #[tokio::test]
        async fn test_sends_headers_and_returns_response() {
            let (url, mut requests) = spawn_server().await;
            let backend = ReqwestBackend::new(Duration::from_secs(5), 0).unwrap();

            let response = backend.get(Session::Stateless, url).await.unwrap();
            assert_eq!(response.status, 200);
            assert_eq!(response.body, OK_BODY);

            let head = requests.recv().await.unwrap();
            assert!(head.starts_with("get /ws/1.1/token.get?app_id=web-desktop-app-v1.0 "));
            assert!(head.contains("accept: application/json\r\n"));
            assert!(head.contains(&format!("user-agent: {}\r\n", USER_AGENT.to_lowercase())));
        }

        #[tokio::test]
        async fn test_cookie_session_replays_cookies_until_cleared() {
            let (url, mut requests) = spawn_server().await;
            let backend = ReqwestBackend::new(Duration::from_secs(5), 0).unwrap();

            backend.get(Session::Cookies, url.clone()).await.unwrap();
            assert!(!requests.recv().await.unwrap().contains("cookie:"));

            backend.get(Session::Cookies, url.clone()).await.unwrap();
            assert!(requests.recv().await.unwrap().contains("cookie: mxm_session=abc"));

            // The stateless session never carries them
            backend.get(Session::Stateless, url.clone()).await.unwrap();
            assert!(!requests.recv().await.unwrap().contains("cookie:"));

            backend.clear_cookies().await;
            backend.get(Session::Cookies, url).await.unwrap();
            assert!(!requests.recv().await.unwrap().contains("cookie:"));
        }

        #[tokio::test]
        async fn test_unresponsive_server_times_out_as_status_zero() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let _held = listener.accept().await;
                std::future::pending::<()>().await;
            });

            let backend = ReqwestBackend::new(Duration::from_millis(200), 0).unwrap();
            let url = Url::parse(&format!("http://{addr}/ws/1.1/token.get")).unwrap();
            let err = backend.get(Session::Stateless, url).await.unwrap_err();
            assert!(matches!(err, MusixmatchError::Transport { status: 0, .. }));
        }

        #[tokio::test]
        async fn test_refused_connection_is_status_zero() {
            let addr = {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                listener.local_addr().unwrap()
            };

            let backend = ReqwestBackend::new(Duration::from_secs(2), 0).unwrap();
            let url = Url::parse(&format!("http://{addr}/ws/1.1/token.get")).unwrap();
            let err = backend.get(Session::Cookies, url).await.unwrap_err();
            assert!(matches!(err, MusixmatchError::Transport { status: 0, .. }));
        }
    }
}
