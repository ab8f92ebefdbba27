//! Tracing setup for the binary: stderr plus a daily log file

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Default stderr filter when `RUST_LOG` is unset
const DEFAULT_CONSOLE_FILTER: &str = "warn";

/// Install the global subscriber.
///
/// Stderr honors `RUST_LOG` (default `warn`); `<log_dir>/<name>.<date>.log`
/// receives everything at `info` and above. Keep the returned guard alive
/// until exit so buffered file output is flushed.
pub fn init(log_dir: &Path, name: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {:?}", log_dir))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(name)
        .filename_suffix("log")
        .build(log_dir)
        .context("failed to open log file")?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_FILTER));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(LevelFilter::INFO),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
