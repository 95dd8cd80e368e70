//! Shared logging utilities for Olivia Gold maintenance binaries.
//!
//! Two outputs exist side by side:
//! - `tracing` events, written to a daily rolling file under
//!   `$OLIVIAGOLD_HOME/logs` and mirrored to stderr with `--verbose`
//! - operator status lines (`[info]`, `[ok]`, `[warn]`, `[error]`), see [`console`]

pub mod console;

pub use console::{format_status, ConsoleReporter, Severity, StatusReporter};

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "oliviagold=info,oliviagold_guard=info";
const HOME_ENV: &str = "OLIVIAGOLD_HOME";

/// Logging configuration shared by Olivia Gold binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Keeps the non-blocking file writer alive; flushes on drop.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize tracing with a rolling file writer and optional stderr output.
///
/// A log directory that cannot be created is reported and skipped; the
/// process keeps running with console logging only.
pub fn init_logging(config: LogConfig<'_>) -> Result<LoggingGuard> {
    let (file_layer, file_guard) = match ensure_logs_dir() {
        Ok(log_dir) => {
            let file_name = format!("{}.log", sanitize_name(config.app_name));
            let appender = tracing_appender::rolling::daily(log_dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(default_filter());
            (Some(layer), Some(guard))
        }
        Err(err) => {
            eprintln!("Warning: failed to create logs directory: {:#}", err);
            (None, None)
        }
    };

    let console_filter = if config.verbose {
        default_filter()
    } else {
        EnvFilter::new("off")
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard { _file: file_guard })
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Get the Olivia Gold home directory: ~/.oliviagold
pub fn oliviagold_home() -> PathBuf {
    match std::env::var(HOME_ENV) {
        Ok(override_path) if !override_path.is_empty() => PathBuf::from(override_path),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".oliviagold"),
    }
}

/// Get the logs directory: ~/.oliviagold/logs
pub fn logs_dir() -> PathBuf {
    oliviagold_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
