//! Flexible Logging System for Lumen Core.
//!
//! This module provides a configurable logging framework for the Lumen
//! stack, built upon the `tracing` ecosystem. It supports console output
//! and optional file logging with configurable formats.

use crate::config::LoggingConfig;
use crate::error::CoreError;
use crate::utils;

use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Global static to hold the `WorkerGuard` for the file logger.
/// Keeping the guard alive for the duration of the application lets buffered
/// log lines flush on shutdown.
static LOG_WORKER_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// Initializes a minimal logging setup, directing messages to `stderr`.
///
/// Intended for tests, early startup before configuration is loaded, or as
/// a fallback when full initialization fails. Filters via `RUST_LOG`,
/// defaulting to "info". Errors (e.g. a logger already being set) are
/// ignored.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .try_init();
}

/// Creates a file logging layer.
///
/// Ensures the parent directory for the log file exists, sets up a daily
/// rolling file appender, and configures the log format (text or JSON).
fn create_file_layer(
    log_path: &Path,
    format: &str,
) -> Result<(Box<dyn Layer<Registry> + Send + Sync + 'static>, WorkerGuard), CoreError> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            utils::fs::ensure_dir_exists(parent)?;
        }
    }

    let file_appender = tracing_appender::rolling::daily(
        log_path.parent().unwrap_or_else(|| Path::new(".")),
        log_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("lumen.log")),
    );

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    match format {
        "json" => {
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking_writer)
                .with_ansi(false);
            Ok((Box::new(layer), guard))
        }
        _ => {
            let layer = fmt::layer()
                .with_writer(non_blocking_writer)
                .with_ansi(false);
            Ok((Box::new(layer), guard))
        }
    }
}

/// Initializes the global logging system based on the provided
/// [`LoggingConfig`].
///
/// Configures and sets the global `tracing` subscriber with a console layer
/// and, when `config.file_path` is set, a file layer. Returns
/// [`CoreError::LoggingInitialization`] if a global subscriber is already
/// installed.
pub fn initialize_logging(config: &LoggingConfig) -> Result<(), CoreError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| CoreError::LoggingInitialization(format!("invalid log filter: {}", e)))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync + 'static>> = Vec::new();
    layers.push(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
            .boxed(),
    );
    if let Some(path) = &config.file_path {
        let (file_layer, guard) = create_file_layer(path, &config.format)?;
        *LOG_WORKER_GUARD.lock().expect("log guard mutex poisoned") = Some(guard);
        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| CoreError::LoggingInitialization(e.to_string()))?;

    tracing::debug!(
        level = %config.level,
        file = ?config.file_path,
        "logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // A single test exercises both entry points: only one global subscriber
    // can ever be installed per process, and the second attempt must report
    // that instead of panicking.
    #[test]
    fn test_initialize_then_reinitialize_reports_error() {
        let config = LoggingConfig::default();
        let first = initialize_logging(&config);
        if first.is_ok() {
            let second = initialize_logging(&config);
            assert!(matches!(second, Err(CoreError::LoggingInitialization(_))));
        }
        // Minimal init after a full init must be a no-op rather than a panic.
        init_minimal_logging();
    }
}
