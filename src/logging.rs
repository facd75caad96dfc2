use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keeps the non-blocking file writer flushing; dropped on process exit.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn init_tracing(default_level: &str) -> Option<FileLogGuard> {
    let filter = EnvFilter::try_new(default_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match file_sink() {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    guard
}

/// Daily rolling appender under LOG_DIR, opted in with ENABLE_FILE_LOGS.
fn file_sink() -> Option<(NonBlocking, WorkerGuard)> {
    let enabled = std::env::var("ENABLE_FILE_LOGS").is_ok_and(|v| v == "true" || v == "1");
    if !enabled {
        return None;
    }

    let dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    if let Err(err) = std::fs::create_dir_all(&dir) {
        eprintln!("failed to create log directory {dir}: {err}");
        return None;
    }

    let appender = RollingFileAppender::new(Rotation::DAILY, &dir, "tisa-api.log");
    Some(tracing_appender::non_blocking(appender))
}
