//! Tracing subscriber setup for the CLI

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// File name prefix for rotated log files
const LOG_FILE_PREFIX: &str = "brutal-compat.log";

const DEFAULT_LEVEL: &str = "info";

fn env_filter() -> EnvFilter {
    // RUST_LOG=brutal_compat=debug
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

type InitResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

/// A subscriber may already be set (tests, embedding binaries); the existing
/// one keeps running.
fn report_init_failure(result: InitResult) {
    if let Err(e) = result {
        eprintln!("Failed to install log subscriber: {e}");
    }
}

/// Install the global subscriber.
///
/// Without a directory, logs go to stderr so stdout stays free for reports.
/// With one, JSON lines go to a daily-rotated file inside it and the returned
/// guard must be held until exit so buffered records are flushed.
pub fn init(log_dir: Option<&Path>) -> std::io::Result<Option<WorkerGuard>> {
    let Some(dir) = log_dir else {
        let installed = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init();
        report_init_failure(installed);
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .json()
        .try_init();
    report_init_failure(installed);

    Ok(Some(guard))
}
