//! Logging system configuration and initialization
//!
//! Console output plus an optional non-blocking log file next to the
//! executable. A leftover file from a previous run is renamed with its
//! modification timestamp before the new one is opened.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::Utc;
use lazy_static::lazy_static;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_NAME: &str = "geokrety-client.log";

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

/// Get the log directory relative to the executable location.
#[must_use]
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    exe_dir.join("logs")
}

/// Initialize the logging system with the default configuration.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging with custom configuration.
///
/// The `RUST_LOG` environment variable overrides the configured level.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let console_layer = fmt::layer().with_target(true);

    if config.file_output {
        let log_dir = get_log_directory();
        std::fs::create_dir_all(&log_dir)
            .map_err(|error| anyhow!("failed to create log directory {log_dir:?}: {error}"))?;
        rotate_existing_log_file(&log_dir)?;

        let appender = rolling::never(&log_dir, LOG_FILE_NAME);
        let (writer, guard) = non_blocking(appender);
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("log guard store poisoned"))?
            .push(guard);
        let file_layer = fmt::layer().with_ansi(false).with_writer(writer);

        Registry::default()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|error| anyhow!("logging already initialized: {error}"))?;
    } else {
        Registry::default()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .map_err(|error| anyhow!("logging already initialized: {error}"))?;
    }

    Ok(())
}

/// Rotate an existing log file by renaming it with its timestamp.
fn rotate_existing_log_file(log_dir: &Path) -> Result<()> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);
    if !log_file_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(&log_file_path)
        .map_err(|error| anyhow!("failed to get log file metadata: {error}"))?;
    let file_time = metadata
        .modified()
        .or_else(|_| metadata.created())
        .unwrap_or_else(|_| std::time::SystemTime::now());

    let datetime: chrono::DateTime<Utc> = file_time.into();
    let file_stem = LOG_FILE_NAME.trim_end_matches(".log");
    let timestamped_name = format!("{file_stem}.{}.log", datetime.format("%Y%m%dT%H%M%S"));
    std::fs::rename(&log_file_path, log_dir.join(&timestamped_name)).map_err(|error| {
        anyhow!("failed to rotate log file {}: {error}", log_file_path.display())
    })?;

    Ok(())
}
