//! Artifact downloads.
//!
//! This module provides:
//! - Full downloads with optional digest verification (`orchestrator`, `checksum`)
//! - Tail-range metadata probing of container archives (`probe`)
//! - Fixed-size chunk streaming of response bodies (`stream`)
//! - Progress decision and rendering (`progress`)
//!
//! # Architecture
//!
//! ```text
//! Downloader::download_file
//!         │
//!         ├── FetchStrategy::Full ──► GET (identity) ──► stream to disk ──► Hashes check
//!         │
//!         └── FetchStrategy::PartialProbe
//!                 │
//!                 └── loop: GET (Range: bytes=-N) ──► stream to disk ──► ZipIndex
//!                           └── no */METADATA yet: N *= 2
//!
//! stream to disk = response_filename + ResponseChunks [+ ProgressChunks] ──► BufWriter
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use artifetch::config::FetchConfig;
//! use artifetch::download::Downloader;
//! use artifetch::http::ReqwestSession;
//! use artifetch::link::ArtifactReference;
//!
//! let config = FetchConfig::default();
//! let downloader = Downloader::new(ReqwestSession::new(&config)?, config);
//!
//! let reference = ArtifactReference::parse("https://example.com/demo-1.0-py3-none-any.whl")?;
//! let download = downloader.download_file(&reference, Path::new("downloads"), None)?;
//! println!("{} ({})", download.path.display(), download.content_type);
//! ```

mod checksum;
mod orchestrator;
mod probe;
mod progress;
mod stream;

use std::path::PathBuf;

use crate::link::ArtifactReference;

pub use checksum::{HashAlgorithm, Hashes};
pub use orchestrator::{ChunkStream, Downloader};
pub use progress::{
    should_show_progress, IndicatifRenderer, ProgressBarStyle, ProgressChunks, ProgressRenderer,
    ProgressSink, PROGRESS_THRESHOLD,
};
pub use stream::ResponseChunks;

/// Name suffix of the archive entry a probe must find.
pub const METADATA_SUFFIX: &str = "/METADATA";

/// A file written to disk by the downloader.
///
/// The caller owns the file; nothing here deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Absolute path of the written file.
    pub path: PathBuf,
    /// `Content-Type` of the response, empty when absent.
    pub content_type: String,
}

/// How an artifact is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Download the whole resource.
    Full,
    /// Download growing tail windows until the metadata entry is visible.
    PartialProbe,
}

impl FetchStrategy {
    /// Exactly one strategy applies, decided by the reference alone.
    pub fn for_reference(reference: &ArtifactReference) -> Self {
        if reference.is_container_archive() {
            Self::PartialProbe
        } else {
            Self::Full
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selection() {
        let wheel = ArtifactReference::parse("https://example.com/demo-1.0-py3-none-any.whl").unwrap();
        let sdist = ArtifactReference::parse("https://example.com/demo-1.0.tar.gz").unwrap();

        assert_eq!(FetchStrategy::for_reference(&wheel), FetchStrategy::PartialProbe);
        assert_eq!(FetchStrategy::for_reference(&sdist), FetchStrategy::Full);
        assert_eq!(
            FetchStrategy::for_reference(&wheel.with_container_archive(false)),
            FetchStrategy::Full
        );
    }
}
