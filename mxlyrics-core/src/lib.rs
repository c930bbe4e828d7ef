pub mod cache;
pub mod config;
pub mod error;
pub mod paths;
pub mod provider;
pub mod query;
pub mod time;

pub use cache::{CacheKey, CachedResult, LyricsCache, MIN_CACHE_ENTRIES};
pub use config::{Config, LoggingConfig, MusixmatchConfig};
pub use error::CoreError;
pub use paths::{
    config_dir, config_path, log_file_path, token_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    LOG_FILE_NAME, TOKEN_FILE_NAME,
};
pub use provider::{LyricLine, LyricsProvider, LyricsResult, TrackInfo};
pub use query::ParsedQuery;
pub use time::DurationExt;
