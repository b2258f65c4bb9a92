//! Artifact references.

use std::fmt;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::response::sanitize_content_filename;
use crate::util::redact_auth_from_url;

/// Extension of archives whose metadata can be probed with a tail range request.
pub const WHEEL_EXTENSION: &str = ".whl";

/// An immutable reference to a remote artifact.
///
/// Built by the caller before a download starts; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    url: String,
    url_without_fragment: String,
    show_url: String,
    netloc: String,
    filename: String,
    is_container_archive: bool,
}

impl ArtifactReference {
    /// Parse an artifact URL, e.g.
    /// `https://files.example.org/pkg-1.0-py3-none-any.whl#sha256=...`.
    ///
    /// The suggested filename is the percent-decoded last path segment, or
    /// the network location when the path is empty.
    pub fn parse(url: &str) -> FetchResult<Self> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: redact_auth_from_url(url),
            reason: e.to_string(),
        })?;

        let netloc = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };

        let mut without_fragment = parsed.clone();
        without_fragment.set_fragment(None);

        let last_segment = parsed
            .path()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let decoded = percent_decode_str(last_segment).decode_utf8_lossy();

        let filename = match sanitize_content_filename(&decoded) {
            name if !name.is_empty() => name,
            _ => netloc.clone(),
        };
        if filename.is_empty() {
            return Err(FetchError::InvalidUrl {
                url: redact_auth_from_url(url),
                reason: "cannot derive a filename".to_string(),
            });
        }

        let show_url = parsed
            .path()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            url: url.to_string(),
            url_without_fragment: without_fragment.to_string(),
            show_url,
            is_container_archive: filename.to_ascii_lowercase().ends_with(WHEEL_EXTENSION),
            netloc,
            filename,
        })
    }

    /// Override whether the tail-range metadata probe applies.
    pub fn with_container_archive(mut self, is_container_archive: bool) -> Self {
        self.is_container_archive = is_container_archive;
        self
    }

    /// The URL as given by the caller, fragment included.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The URL used on the wire.
    pub fn url_without_fragment(&self) -> &str {
        &self.url_without_fragment
    }

    /// Short display form: the last path segment.
    pub fn show_url(&self) -> &str {
        &self.show_url
    }

    /// Host and optional port.
    pub fn netloc(&self) -> &str {
        &self.netloc
    }

    /// Suggested filename. Never empty and free of path separators.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Whether the artifact is an archive whose index can be probed from its tail.
    pub fn is_container_archive(&self) -> bool {
        self.is_container_archive
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact_auth_from_url(&self.url))
    }
}
