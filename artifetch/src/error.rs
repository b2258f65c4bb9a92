//! Error types for artifact retrieval.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching an artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The artifact reference could not be parsed.
    #[error("invalid artifact url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request failed before a response was received.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// Network timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a non-success status.
    #[error("HTTP error {status} while getting {url}")]
    HttpStatus { status: u16, url: String },

    /// Failed while reading the response body.
    #[error("failed to read response body from {url}: {source}")]
    Read { url: String, source: io::Error },

    /// Failed to read a file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// The downloaded file does not match any allowed digest.
    #[error(
        "hash mismatch for {}: expected one of [{}], got {actual}",
        path.display(),
        expected.join(", ")
    )]
    HashMismatch {
        path: PathBuf,
        expected: Vec<String>,
        actual: String,
    },

    /// A hash specification could not be parsed.
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    /// The metadata probe gave up before finding the metadata entry.
    #[error("gave up probing {url} for metadata at a {window} byte window")]
    ProbeExhausted { url: String, window: u64 },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display() {
        let err = FetchError::HttpStatus {
            status: 404,
            url: "https://example.com/pkg.whl".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP error 404 while getting https://example.com/pkg.whl"
        );
    }

    #[test]
    fn test_hash_mismatch_display() {
        let err = FetchError::HashMismatch {
            path: PathBuf::from("/tmp/pkg.tar.gz"),
            expected: vec!["sha256:abc123".to_string(), "sha256:def456".to_string()],
            actual: "sha256:0000".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("hash mismatch"));
        assert!(msg.contains("sha256:abc123, sha256:def456"));
        assert!(msg.contains("sha256:0000"));
    }

    #[test]
    fn test_write_failed_has_source() {
        use std::error::Error as _;

        let err = FetchError::WriteFailed {
            path: PathBuf::from("/readonly/file"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/readonly/file"));
    }
}
