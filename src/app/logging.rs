//! Usage: Process-wide tracing setup (stderr + daily rolling file, `log` bridge, panic hook).

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_DIR_NAME: &str = "logs";
pub const DEFAULT_LOG_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "electric-bill";
const LOG_FILE_SUFFIX: &str = "log";
const MAX_LOG_FILES: usize = 14;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

fn build_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_new(filter.trim()).unwrap_or_else(|e| {
        eprintln!("invalid log filter {filter:?} ({e}); using {DEFAULT_LOG_FILTER}");
        EnvFilter::new(DEFAULT_LOG_FILTER)
    })
}

/// Installs the global subscriber once. The returned guard flushes the file writer on drop and
/// must be held for the life of the process. Later calls are no-ops and return `None`.
pub fn init(log_dir: &Path, filter: &str) -> Option<WorkerGuard> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return None;
    }

    let appender = std::fs::create_dir_all(log_dir)
        .map_err(|e| e.to_string())
        .and_then(|()| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix(LOG_FILE_SUFFIX)
                .max_log_files(MAX_LOG_FILES)
                .build(log_dir)
                .map_err(|e| e.to_string())
        });

    let (file_layer, guard) = match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "file logging disabled, cannot open {}: {e}",
                log_dir.display()
            );
            (None, None)
        }
    };

    let subscriber = tracing_subscriber::registry()
        .with(build_filter(filter))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer);

    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("log bridge already installed: {e}");
    }
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("tracing subscriber already installed: {e}");
        return None;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Payload is not logged; it can carry user data.
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        tracing::error!(location = %location, "panic at {location}");
        previous_hook(panic_info);
    }));

    tracing::info!(
        log_dir = %log_dir.display(),
        filter = filter.trim(),
        file_logging = guard.is_some(),
        "logging initialized"
    );

    guard
}
