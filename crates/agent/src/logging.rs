//! Tracing setup: console output always, plus a daily rolling log file when
//! `LOG_DIR` is set.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "watchdog_agent=info,watchdog_notify=info";
const LOG_FILE_PREFIX: &str = "service_monitor";
const MAX_LOG_FILES: usize = 30;

/// Keeps the file writer flushing for the lifetime of the process.
static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. A log directory that cannot be prepared
/// leaves console logging in place and is reported as a warning.
pub fn init_tracing() {
    let log_dir = std::env::var_os("LOG_DIR").filter(|d| !d.is_empty());

    let (file_writer, file_error) = match log_dir.as_deref().map(Path::new) {
        Some(dir) => match rolling_writer(dir) {
            Ok(writer) => (Some(writer), None),
            Err(e) => (None, Some((dir.display().to_string(), e.to_string()))),
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer())
        .with(file_writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false)))
        .init();

    if let Some((dir, error)) = file_error {
        tracing::warn!(dir = %dir, error = %error, "Log file output disabled");
    }
}

fn rolling_writer(dir: &Path) -> Result<NonBlocking, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = GUARD.set(guard);
    Ok(writer)
}
