//! The downloader: strategy selection, full downloads and shared streaming.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::header::HeaderMap;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, Level};

use super::checksum::Hashes;
use super::progress::{should_show_progress, IndicatifRenderer, ProgressChunks, ProgressRenderer};
use super::stream::ResponseChunks;
use super::{Download, FetchStrategy};
use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use crate::http::{identity_headers, HttpResponse, HttpSession, ResponseMetadata};
use crate::link::ArtifactReference;
use crate::response::{response_filename, response_size};
use crate::util::{format_size, redact_auth_from_url};

/// A lazily read sequence of body chunks.
pub type ChunkStream = Box<dyn Iterator<Item = FetchResult<Vec<u8>>>>;

/// Downloads artifacts into a local directory.
///
/// The session supplies HTTP, the renderer draws progress; both are
/// injected so tests can run without network or terminal.
pub struct Downloader<S> {
    pub(super) session: S,
    pub(super) config: FetchConfig,
    renderer: Arc<dyn ProgressRenderer>,
    log_level: Option<LevelFilter>,
}

impl<S: HttpSession> Downloader<S> {
    /// Create a downloader drawing progress with `indicatif`.
    pub fn new(session: S, config: FetchConfig) -> Self {
        Self {
            session,
            config,
            renderer: Arc::new(IndicatifRenderer::new()),
            log_level: None,
        }
    }

    /// Use a different progress renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ProgressRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Pin the verbosity used for the progress decision.
    ///
    /// By default the decision follows whether the installed subscriber
    /// lets this crate's INFO events through.
    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Download `reference` into `destination_dir`.
    ///
    /// Container archives are probed for their metadata with tail range
    /// requests and are not hash-checked, since the file on disk is
    /// deliberately incomplete. Everything else is downloaded in full and,
    /// when `hashes` is non-empty, verified. A file failing verification is
    /// left on disk; removing it is up to the caller.
    pub fn download_file(
        &self,
        reference: &ArtifactReference,
        destination_dir: &Path,
        hashes: Option<&Hashes>,
    ) -> FetchResult<Download> {
        let destination_dir = std::path::absolute(destination_dir).map_err(|e| {
            FetchError::CreateDirFailed {
                path: destination_dir.to_path_buf(),
                source: e,
            }
        })?;
        fs::create_dir_all(&destination_dir).map_err(|e| FetchError::CreateDirFailed {
            path: destination_dir.clone(),
            source: e,
        })?;

        match FetchStrategy::for_reference(reference) {
            FetchStrategy::PartialProbe => self.probe(reference, &destination_dir),
            FetchStrategy::Full => self.download_full(reference, &destination_dir, hashes),
        }
    }

    fn download_full(
        &self,
        reference: &ArtifactReference,
        destination_dir: &Path,
        hashes: Option<&Hashes>,
    ) -> FetchResult<Download> {
        let response = self.request(reference, &identity_headers())?;
        let download = self.save_response(response, reference, destination_dir)?;

        if let Some(hashes) = hashes.filter(|h| !h.is_empty()) {
            hashes.check_against_path(&download.path)?;
            debug!(path = %download.path.display(), "Hash verified");
        }

        Ok(download)
    }

    /// Issue a GET and reject non-success statuses.
    pub(super) fn request(
        &self,
        reference: &ArtifactReference,
        headers: &HeaderMap,
    ) -> FetchResult<HttpResponse> {
        let response = self.session.get(reference.url_without_fragment(), headers)?;

        let status = response.meta.status;
        if !status.is_success() {
            error!(
                status = status.as_u16(),
                "HTTP error {} while getting {}",
                status.as_u16(),
                reference
            );
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: redact_auth_from_url(reference.url_without_fragment()),
            });
        }

        Ok(response)
    }

    /// Stream a response into `destination_dir` under its resolved name.
    pub(super) fn save_response(
        &self,
        response: HttpResponse,
        reference: &ArtifactReference,
        destination_dir: &Path,
    ) -> FetchResult<Download> {
        let total_size = response_size(&response.meta);
        let filename = response_filename(&response.meta, reference);
        let content_type = response.meta.content_type().to_string();
        let path = destination_dir.join(&filename);

        let level = self.log_level.unwrap_or_else(effective_level);
        let show_progress = should_show_progress(&response.meta, total_size, level);
        let chunks = self.prepare_stream(response, reference, total_size, show_progress);
        let written = write_chunks(&path, chunks)?;
        debug!(path = %path.display(), bytes = written, "Saved response");

        Ok(Download { path, content_type })
    }

    /// Turn a response body into a chunk stream, announcing the download.
    ///
    /// Logs one `Downloading …`/`Using cached …` line and, when
    /// `show_progress` is set, reports every chunk to the progress renderer.
    pub fn prepare_stream(
        &self,
        response: HttpResponse,
        reference: &ArtifactReference,
        total_size: Option<u64>,
        show_progress: bool,
    ) -> ChunkStream {
        info!("{}", self.announcement(&response.meta, reference, total_size));

        let chunks = ResponseChunks::new(response.body, response.meta.url, self.config.chunk_size);
        if show_progress {
            let sink = self.renderer.begin(self.config.progress_bar, total_size);
            Box::new(ProgressChunks::new(chunks, sink))
        } else {
            Box::new(chunks)
        }
    }
}

impl<S> Downloader<S> {
    /// The `Downloading …`/`Using cached …` line logged before a body is read.
    ///
    /// Artifacts on the file storage domain are shown by their last path
    /// segment; anything else by its full URL with credentials redacted.
    fn announcement(
        &self,
        meta: &ResponseMetadata,
        reference: &ArtifactReference,
        total_size: Option<u64>,
    ) -> String {
        let logged_url = if reference.netloc() == self.config.file_storage_domain {
            reference.show_url().to_string()
        } else {
            redact_auth_from_url(reference.url_without_fragment())
        };
        let action = if meta.from_cache {
            "Using cached"
        } else {
            "Downloading"
        };

        match total_size {
            Some(size) => format!("{} {} ({})", action, logged_url, format_size(size)),
            None => format!("{} {}", action, logged_url),
        }
    }
}

/// Verbosity of this crate under the installed subscriber.
///
/// Per-target filters count, so `artifetch=warn` hides progress even when
/// other targets log at INFO.
fn effective_level() -> LevelFilter {
    if tracing::enabled!(Level::INFO) {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    }
}

/// Write every chunk to `path`, replacing any previous content.
fn write_chunks(path: &Path, chunks: ChunkStream) -> FetchResult<u64> {
    let write_err = |e| FetchError::WriteFailed {
        path: PathBuf::from(path),
        source: e,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    let mut written = 0u64;

    for chunk in chunks {
        let chunk = chunk?;
        writer.write_all(&chunk).map_err(write_err)?;
        written += chunk.len() as u64;
    }
    writer.flush().map_err(write_err)?;

    Ok(written)
}
