use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize logging.
///
/// Console output goes to stderr so that `--format json|yaml` stays parseable.
/// When `log_dir` is given a daily-rolling file layer is added and the returned
/// guard must be held until exit to flush it.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // RUST_LOG wins over the --verbose flag
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Set up time formatting with local time
    let timer = OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
        // Fallback to UTC if local time fails (can happen in some environments)
        OffsetTime::new(
            time::UtcOffset::UTC,
            time::format_description::well_known::Rfc3339,
        )
    });

    // Optional file output
    let (file_layer, guard) = match log_dir {
        Some(log_dir) => {
            // Create the directory if it doesn't exist
            std::fs::create_dir_all(log_dir)
                .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

            // Create a rolling file appender that creates a new log file daily
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("grantsync")
                .filename_suffix("log")
                .build(log_dir)
                .context("Failed to create rolling log file")?;

            // Create a non-blocking writer
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // File layer with full details
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_timer(timer.clone())
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Create the subscriber with optional file output and console output
    tracing_subscriber::registry()
        .with(file_layer)
        // Console layer on stderr
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(timer)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        // Environment filter
        .with(filter)
        // Initialize the subscriber
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(log_dir) = log_dir {
        tracing::debug!("Log files are being written to: {:?}", log_dir);
    }
    Ok(guard)
}
