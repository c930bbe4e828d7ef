use thiserror::Error;

/// Errors raised while talking to the Musixmatch desktop API.
///
/// `Clone` so a single coalesced token fetch can hand its outcome to every waiter.
#[derive(Debug, Clone, Error)]
pub enum MusixmatchError {
    /// No usable HTTP response: connection failure or timeout (`status == 0`),
    /// or a non-2xx status without a parseable API envelope.
    #[error("HTTP transport error (status {status}): {reason}")]
    Transport { status: u16, reason: String },

    /// The envelope was decoded but its header status was not 200.
    #[error("Musixmatch API error {code}: {}", .hint.as_deref().unwrap_or("no hint"))]
    Api { code: u16, hint: Option<String> },

    /// A successful HTTP response whose body is not the expected shape.
    #[error("Malformed Musixmatch response: {0}")]
    Malformed(String),

    /// A request URL could not be assembled.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be created.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl MusixmatchError {
    /// Check if this is an auth-class API rejection (401/403)
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Api { code: 401 | 403, .. })
    }

    /// Check if the API hint reports a captcha challenge, which invalidates
    /// the whole session rather than just the token.
    #[must_use]
    pub fn is_captcha(&self) -> bool {
        match self {
            Self::Api {
                hint: Some(hint), ..
            } => hint.to_lowercase().contains("captcha"),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for MusixmatchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            status: 0,
            reason: e.to_string(),
        }
    }
}

impl From<reqwest_middleware::Error> for MusixmatchError {
    fn from(e: reqwest_middleware::Error) -> Self {
        Self::Transport {
            status: 0,
            reason: e.to_string(),
        }
    }
}
