//! Logging setup.
//!
//! Log output never goes to stdout, which carries the run summary.

mod logging;

pub use logging::{LOG_FILTER_ENV, LogFormat, LoggingConfig};

use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed or the log file
/// cannot be opened.
pub fn init(config: LoggingConfig) -> Result<()> {
    match (&config.file, config.format) {
        (Some(log_file), LogFormat::Json) => {
            let writer = open_log_file(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_current_span(true)
                        .with_target(true),
                )
                .with(config.filter)
                .try_init()
                .map_err(init_error)?;
        },
        (Some(log_file), LogFormat::Pretty) => {
            let writer = open_log_file(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .with(config.filter)
                .try_init()
                .map_err(init_error)?;
        },
        (None, LogFormat::Json) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_current_span(true)
                        .with_target(true),
                )
                .with(config.filter)
                .try_init()
                .map_err(init_error)?;
        },
        (None, LogFormat::Pretty) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true),
                )
                .with(config.filter)
                .try_init()
                .map_err(init_error)?;
        },
    }
    Ok(())
}

/// Shared append-only log file.
#[derive(Clone)]
struct LogFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn open_log_file(path: &Path) -> Result<LogFileWriter> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_log_dir".to_string(),
            cause: e.to_string(),
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::OperationFailed {
            operation: "open_log_file".to_string(),
            cause: format!("{}: {}", path.display(), e),
        })?;

    Ok(LogFileWriter {
        file: Arc::new(Mutex::new(file)),
    })
}

#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "logging_init".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("clinigraph.log");

        let mut writer = open_log_file(&path).unwrap();
        writer.write_all(b"line\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    }

    #[test]
    fn test_open_log_file_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clinigraph.log");
        std::fs::write(&path, "first\n").unwrap();

        let mut writer = open_log_file(&path).unwrap();
        writer.write_all(b"second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
