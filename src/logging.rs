//! Tracing setup for the gateway binary.
//!
//! Everything goes to stdout in compact form and to a log file through a non-blocking writer.
//! `RUST_LOG` filters both layers and defaults to `info`.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Config;

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "ragbridge.log";

/// Where file logs are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Append to a caller-chosen file.
    File(PathBuf),
    /// `logs/ragbridge.log` under the working directory.
    Default,
}

impl LogDestination {
    /// Destination selected by `config.log_file`.
    pub fn from_config(config: &Config) -> Self {
        match &config.log_file {
            Some(path) => Self::File(path.clone()),
            None => Self::Default,
        }
    }

    fn open(&self) -> std::io::Result<(NonBlocking, WorkerGuard)> {
        match self {
            Self::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                Ok(tracing_appender::non_blocking(file))
            }
            Self::Default => {
                std::fs::create_dir_all(DEFAULT_LOG_DIR)?;
                let appender = tracing_appender::rolling::never(DEFAULT_LOG_DIR, DEFAULT_LOG_FILE);
                Ok(tracing_appender::non_blocking(appender))
            }
        }
    }

    fn display_path(&self) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Default => Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE),
        }
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped, so the caller keeps it alive
/// until shutdown. `None` means the log file could not be opened and only stdout is active.
pub fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let destination = LogDestination::from_config(config);
    match destination.open() {
        Ok((writer, guard)) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
            Some(guard)
        }
        Err(err) => {
            registry.init();
            tracing::warn!(
                path = %destination.display_path().display(),
                error = %err,
                "File logging disabled"
            );
            None
        }
    }
}
