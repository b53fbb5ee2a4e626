// Habitd - personal habit tracking API
//
// A small single-user backend: habits and daily entries live in flat JSON
// files, and aggregate statistics (streaks, completion rates, time-of-day
// patterns, weekly trends) are derived on demand from the entry log.
//
// Architecture:
// - API server (axum): CRUD over the two collections plus statistics routes
// - Aggregation engine: pure functions over the entries collection
// - Storage: pretty-printed JSON files, one per collection, with an
//   optional best-effort mirror
// - Config: env > ~/.config/habitd/config.toml > defaults, built once and
//   passed into the router state

mod api;
mod cli;
mod config;
mod models;
mod stats;
mod storage;

use anyhow::Result;
use api::AppState;
use config::{Config, LogRotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --reset, --path)
    // If a command was handled, exit early
    if cli::handle_cli() {
        return Ok(());
    }

    // Ensure config template exists (helps users discover configuration options)
    Config::ensure_config_exists();

    let config = Config::from_env();

    // Initialize tracing with stdout output and optional file logging
    //
    // Precedence: RUST_LOG env var > config file > default "info"
    let default_filter = format!("habitd={},tower_http=debug,axum=debug", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // Set up file logging if enabled (non-blocking writer with rotation)
    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard> =
        if config.logging.file_enabled {
            if let Err(e) = std::fs::create_dir_all(&config.logging.file_dir) {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    config.logging.file_dir, e
                );
                // Fall back to stdout-only logging
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer())
                    .init();
                None
            } else {
                // Create rolling file appender based on configured rotation
                let file_appender = match config.logging.file_rotation {
                    LogRotation::Hourly => tracing_appender::rolling::hourly(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                    LogRotation::Daily => tracing_appender::rolling::daily(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                    LogRotation::Never => tracing_appender::rolling::never(
                        &config.logging.file_dir,
                        &config.logging.file_prefix,
                    ),
                };

                // Wrap in non-blocking writer (writes happen in background thread)
                // File layer uses JSON format for structured log parsing
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer())
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(non_blocking)
                            .with_ansi(false),
                    )
                    .init();

                Some(guard)
            }
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        };

    tracing::debug!("Data directory: {:?}", config.data_dir);
    if config.api_key.is_none() {
        tracing::warn!("No API key configured - every protected route will answer 401");
    }
    if let Some(mirror) = &config.mirror_dir {
        tracing::info!("Mirroring saves to {:?}", mirror);
    }

    let state = AppState::new(config);
    api::serve(state).await
}
