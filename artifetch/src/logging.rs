//! `tracing` subscriber setup.
//!
//! Console output goes to stderr so stdout stays free for results. An
//! optional log file receives the same events without ANSI colors through a
//! non-blocking writer; keep the returned guard alive until exit so buffered
//! lines are flushed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,
    #[error("subscriber init failed: {0}")]
    SubscriberInit(tracing_subscriber::util::TryInitError),
    #[error("invalid log file path {}", .0.display())]
    InvalidPath(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Debug)]
pub struct LogOptions {
    /// Default verbosity; `RUST_LOG` takes precedence when set.
    pub level: LevelFilter,
    /// Also append events to this file.
    pub log_file: Option<PathBuf>,
    /// Colored console output.
    pub ansi: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            log_file: None,
            ansi: true,
        }
    }
}

impl LogOptions {
    /// Options for a `-v` count and a `-q` flag.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        Self {
            level: verbosity_level(verbose, quiet),
            ..Self::default()
        }
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// Map command line verbosity to a level: quiet keeps warnings and errors,
/// each `-v` adds one level above INFO.
pub fn verbosity_level(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::WARN,
        (false, 0) => LevelFilter::INFO,
        (false, 1) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    }
}

/// Install the global subscriber.
///
/// Returns the file writer guard when a log file is configured.
pub fn init_logging(options: &LogOptions) -> Result<Option<WorkerGuard>, LogError> {
    let filter = EnvFilter::builder()
        .with_default_directive(options.level.into())
        .from_env_lossy();

    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(options.ansi)
        .with_writer(io::stderr);

    let (file_layer, guard) = match &options.log_file {
        Some(path) => {
            let (dir, name) = split_log_path(path)?;
            fs::create_dir_all(&dir)?;
            let (writer, guard) = file_writer(rolling::never(dir, name));
            let layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_names(true)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("global") || msg.contains("already") {
                LogError::AlreadyInitialized
            } else {
                LogError::SubscriberInit(e)
            }
        })?;

    Ok(guard)
}

fn file_writer(appender: rolling::RollingFileAppender) -> (non_blocking::NonBlocking, WorkerGuard) {
    non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(appender)
}

/// Split a log file path into its directory and file name.
fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf), LogError> {
    let name = path
        .file_name()
        .ok_or_else(|| LogError::InvalidPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, PathBuf::from(name)))
}
