//! Tracing configuration and log routing.
//!
//! Batch runs log to stdout with a compact formatter. When
//! `STUDY_INGEST_LOG_FILE` is set, a second layer appends to that file
//! through a non-blocking writer; nothing is written to disk otherwise, so
//! the tool leaves no stray log directories behind in whatever cwd it runs
//! from.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Configure tracing for stdout and, when requested, file logging.
///
/// Respects `RUST_LOG` for filtering (defaults to `info`). Returns the file
/// writer's guard when `STUDY_INGEST_LOG_FILE` is set; the caller must keep
/// it alive until the process exits so buffered lines are flushed.
pub fn init_tracing() -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let log_file = std::env::var("STUDY_INGEST_LOG_FILE")
        .ok()
        .and_then(|path| open_log_file(&path));

    match log_file {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

/// Open the log file for appending, creating it if absent.
///
/// Returns `None` (and reports to stderr) when the path cannot be opened;
/// the run proceeds with stdout logging only.
fn open_log_file(path: &str) -> Option<std::fs::File> {
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("Failed to open log file {path}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_created_on_first_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.log");

        let file = open_log_file(&path.to_string_lossy());
        assert!(file.is_some());
        assert!(path.exists());
    }

    #[test]
    fn unopenable_log_path_falls_back_to_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("run.log");

        assert!(open_log_file(&path.to_string_lossy()).is_none());
    }
}
