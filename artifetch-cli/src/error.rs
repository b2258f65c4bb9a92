//! CLI error type.

use artifetch::logging::LogError;
use artifetch::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] LogError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
