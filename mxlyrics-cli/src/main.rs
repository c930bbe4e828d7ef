use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use mxlyrics_core::{Config, CoreError, LyricsProvider, LyricsResult};
use mxlyrics_musixmatch::MusixmatchClient;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "Usage: mxlyrics <artist - title | title>";

fn main() {
    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    // Load config or create template on first run
    let config = match Config::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            show_new_config_message(&path);
            std::process::exit(0);
        }
        Err(e) => {
            error!("{e}");
            eprintln!("Failed to load config from {}: {e}", Config::config_path().display());
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let client = match MusixmatchClient::new(&config.musixmatch) {
        Ok(client) => client,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let provider: Box<dyn LyricsProvider> = Box::new(client);
    info!("Using lyrics provider: {}", provider.name());

    match runtime.block_on(provider.find_lyrics(&query)) {
        Some(result) => print_lyrics(&result),
        None => {
            println!("No lyrics found for \"{query}\"");
            std::process::exit(1);
        }
    }
}

fn print_lyrics(result: &LyricsResult) {
    println!("{} - {}", result.track.author, result.track.title);
    if let Some(art) = &result.track.album_art_url {
        println!("Album art: {art}");
    }
    println!(
        "Source: {} ({})",
        result.source,
        if result.is_synced() { "synced" } else { "plain" }
    );
    println!();

    match &result.lines {
        Some(lines) => {
            for line in lines {
                let secs = line.offset_ms / 1000;
                println!(
                    "[{:02}:{:02}.{:02}] {}",
                    secs / 60,
                    secs % 60,
                    (line.offset_ms % 1000) / 10,
                    line.text
                );
            }
        }
        None => {
            if let Some(text) = &result.text {
                println!("{text}");
            }
        }
    }
}

fn show_new_config_message(path: &Path) {
    println!(
        "Created a new configuration file at {}.\n\
         The defaults work out of the box; edit it to change timeouts or caching, then run mxlyrics again.",
        path.display()
    );
}

fn check_file_logging_enabled() -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(Config::config_path()) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing on stderr, plus a log file when enabled
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Lyrics go to stdout, so logs stay on stderr
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = mxlyrics_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
