//! Path constants for configuration and token files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "mxlyrics";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the persisted Musixmatch user token file
pub const TOKEN_FILE_NAME: &str = "mxm_token.json";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "mxlyrics.log";

/// Get the configuration directory path (~/.config/mxlyrics/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/mxlyrics/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the default token file path (`~/.config/mxlyrics/mxm_token.json`)
#[must_use]
pub fn token_file_path() -> PathBuf {
    config_dir().join(TOKEN_FILE_NAME)
}

/// Get the log file path (`~/.config/mxlyrics/mxlyrics.log`)
#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}
