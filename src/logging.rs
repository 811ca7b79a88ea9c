use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{RelayError, Result};

const DEFAULT_MAX_LOG_FILES: usize = 5;
const LOG_FILE_PREFIX: &str = "relay";

pub struct FileLogger {
    log_directory: PathBuf,
    max_files: usize,
    rotation: Rotation,
}

impl FileLogger {
    pub fn new(log_directory: PathBuf) -> Self {
        Self {
            log_directory,
            max_files: DEFAULT_MAX_LOG_FILES,
            rotation: Rotation::DAILY,
        }
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Creates the log directory and a non-blocking rolling file writer.
    /// The guard must be kept alive for buffered lines to be flushed.
    pub fn setup_file_logging(&self) -> Result<(NonBlocking, WorkerGuard)> {
        std::fs::create_dir_all(&self.log_directory)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(self.rotation.clone())
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .max_log_files(self.max_files)
            .build(&self.log_directory)
            .map_err(|e| {
                RelayError::ConfigError(format!(
                    "Failed to create log file in {:?}: {}",
                    self.log_directory, e
                ))
            })?;

        Ok(tracing_appender::non_blocking(file_appender))
    }
}

/// Installs the global subscriber: console output always, plus a rotated
/// plain-text file when `file_logger` is given. Filtering follows `RUST_LOG`
/// and defaults to `info`.
pub fn setup_logging(file_logger: Option<&FileLogger>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match file_logger {
        Some(file_logger) => {
            let (file_writer, guard) = file_logger.setup_file_logging()?;
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(file_writer)
                        .with_ansi(false),
                )
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            Ok(None)
        }
    }
}
