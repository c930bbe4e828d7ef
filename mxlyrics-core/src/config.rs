use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub musixmatch: MusixmatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusixmatchConfig {
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// How long a lookup result (found or not) stays cached
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_ms: u64,
    /// Maximum number of cached lookups (values below 10 are raised to 10)
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,
    /// Where the last good user token is persisted
    #[serde(default = "crate::paths::token_file_path")]
    pub token_file: PathBuf,
    /// Retries for transient HTTP failures (timeouts, 5xx). Auth retries are separate.
    #[serde(default)]
    pub max_retries: u32,
}

const fn default_request_timeout() -> u64 {
    8000
}

const fn default_cache_ttl() -> u64 {
    300_000
}

const fn default_max_cache_entries() -> usize {
    100
}

impl Default for MusixmatchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout(),
            cache_ttl_ms: default_cache_ttl(),
            max_cache_entries: default_max_cache_entries(),
            token_file: crate::paths::token_file_path(),
            max_retries: 0,
        }
    }
}

impl MusixmatchConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file in the config directory
    #[serde(default)]
    pub enabled: bool,
}

impl Config {
    /// Get the configuration directory path (~/.config/mxlyrics/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/mxlyrics/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default location or create a template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read, parsed or fails validation.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        Self::load(&config_path)
    }

    /// Load config from a specific file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate config from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error on TOML syntax errors or invalid values.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] for zero timeouts or TTLs.
    pub fn validate(&self) -> Result<()> {
        if self.musixmatch.request_timeout_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "musixmatch.request_timeout_ms must be greater than 0".into(),
            });
        }
        if self.musixmatch.cache_ttl_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "musixmatch.cache_ttl_ms must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r#"# mxlyrics Configuration
# ~/.config/mxlyrics/config.toml

[musixmatch]
# Per-request timeout
request_timeout_ms = 8000
# Lookup results (including "not found") are cached for this long
cache_ttl_ms = 300000
# Oldest entries are evicted first once this many lookups are cached (minimum 10)
max_cache_entries = 100
# Retries for transient HTTP failures; auth failures are always retried once
max_retries = 0
# Where the user token is persisted between runs
# token_file = "~/.config/mxlyrics/mxm_token.json"

[logging]
# Also write logs to ~/.config/mxlyrics/mxlyrics.log
enabled = false
"#;
