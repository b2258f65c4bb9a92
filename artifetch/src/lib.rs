//! artifetch - Package artifact retrieval
//!
//! This library downloads package artifacts over HTTP(S) into a local
//! directory. Wheels are not downloaded in full: growing tail windows are
//! requested until the archive's central directory shows a `*/METADATA`
//! entry, which is all a resolver needs to read dependencies.
//!
//! The entry point is [`download::Downloader::download_file`].

pub mod archive;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod link;
pub mod logging;
pub mod response;
pub mod util;

pub use config::FetchConfig;
pub use download::{Download, Downloader, Hashes};
pub use error::{FetchError, FetchResult};
pub use link::ArtifactReference;
