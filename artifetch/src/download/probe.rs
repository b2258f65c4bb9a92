//! Tail-range probing of container archives for their metadata entry.
//!
//! A wheel keeps its central directory at the end of the file, so the
//! metadata entry can usually be located from a short suffix of the archive.
//! The window starts small and doubles until the directory parses and lists
//! an entry ending in [`METADATA_SUFFIX`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::orchestrator::Downloader;
use super::{Download, METADATA_SUFFIX};
use crate::archive::{IndexError, ZipIndex};
use crate::error::{FetchError, FetchResult};
use crate::http::{tail_range_headers, HttpSession};
use crate::link::ArtifactReference;
use crate::util::redact_auth_from_url;

/// Outcome of checking one probe attempt.
enum ProbeOutcome {
    Found,
    NotYet(String),
}

impl<S: HttpSession> Downloader<S> {
    /// Fetch only as much of a container archive's tail as is needed to see
    /// its metadata entry.
    ///
    /// Each attempt overwrites the file from the previous one. Without a
    /// configured `max_probe_window` the window grows until the entry is
    /// found or the transport fails.
    pub fn probe(
        &self,
        reference: &ArtifactReference,
        destination_dir: &Path,
    ) -> FetchResult<Download> {
        let mut window = self.config.initial_probe_window.max(1);
        if let Some(max) = self.config.max_probe_window.filter(|max| window > *max) {
            return Err(FetchError::InvalidConfig(format!(
                "max_probe_window ({}) is smaller than initial_probe_window ({})",
                max, window
            )));
        }
        let mut attempt = 1u32;
        let mut previous: Option<PathBuf> = None;

        loop {
            let response = self.request(reference, &tail_range_headers(window))?;
            let download = self.save_response(response, reference, destination_dir)?;

            if let Some(stale) = previous.take().filter(|p| *p != download.path) {
                if let Err(e) = fs::remove_file(&stale) {
                    warn!(error = %e, path = %stale.display(), "Failed to remove stale partial file");
                }
            }

            match check_metadata(&download.path)? {
                ProbeOutcome::Found => {
                    debug!(attempt, window, path = %download.path.display(), "Metadata entry found");
                    return Ok(download);
                }
                ProbeOutcome::NotYet(reason) => {
                    debug!(attempt, window, reason = %reason, "Metadata entry not in window");
                }
            }

            window = self.next_window(reference, window)?;
            attempt += 1;
            previous = Some(download.path);
        }
    }

    fn next_window(&self, reference: &ArtifactReference, window: u64) -> FetchResult<u64> {
        let exhausted = || FetchError::ProbeExhausted {
            url: redact_auth_from_url(reference.url_without_fragment()),
            window,
        };

        let next = window.checked_mul(2).ok_or_else(exhausted)?;
        match self.config.max_probe_window {
            Some(max) if next > max => Err(exhausted()),
            _ => Ok(next),
        }
    }
}

/// Look for the metadata entry in a (possibly partial) archive on disk.
///
/// An index that cannot be parsed yet is not an error: a larger window may
/// fix it. Only I/O failures propagate.
fn check_metadata(path: &Path) -> FetchResult<ProbeOutcome> {
    match ZipIndex::open(path) {
        Ok(index) if index.contains_suffix(METADATA_SUFFIX) => Ok(ProbeOutcome::Found),
        Ok(index) => Ok(ProbeOutcome::NotYet(format!(
            "{} entries, none ending in {}",
            index.names().len(),
            METADATA_SUFFIX
        ))),
        Err(IndexError::Io(e)) => Err(FetchError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        }),
        Err(e) => Ok(ProbeOutcome::NotYet(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use std::sync::Arc;

    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use tempfile::TempDir;
    use tracing::level_filters::LevelFilter;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    use crate::config::FetchConfig;
    use crate::download::progress::tests::RecordingRenderer;
    use crate::http::tests::{ok_response, tail_len, MockSession};
    use crate::http::{HttpResponse, ResponseMetadata};

    const WHEEL_URL: &str = "https://example.com/packages/demo-1.0-py3-none-any.whl";
    const WHEEL_CONTENT_TYPE: &str = "application/x-wheel+zip";

    fn build_wheel(extra_entries: usize, payload: usize) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);

        writer.start_file("demo/__init__.py", options).unwrap();
        writer.write_all(&vec![b'#'; payload]).unwrap();
        for i in 0..extra_entries {
            writer
                .start_file(format!("demo/generated/module_with_a_long_name_{:04}.py", i), options)
                .unwrap();
            writer.write_all(b"pass\n").unwrap();
        }
        writer.start_file("demo-1.0.dist-info/METADATA", options).unwrap();
        writer.write_all(b"Metadata-Version: 2.1\nName: demo\nVersion: 1.0\n").unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Bytes from the central directory start to the end of the archive.
    fn directory_len(archive: &[u8]) -> u64 {
        let eocd = archive.len() - 22;
        let size = u32::from_le_bytes(archive[eocd + 12..eocd + 16].try_into().unwrap());
        size as u64 + 22
    }

    fn tail(archive: &[u8], window: u64) -> Vec<u8> {
        let start = archive.len().saturating_sub(window as usize);
        archive[start..].to_vec()
    }

    /// Serves the real trailing bytes of `archive` for each range request.
    fn range_server(archive: Vec<u8>) -> MockSession {
        MockSession::new(move |url, headers| {
            let body = match tail_len(headers) {
                Some(n) => tail(&archive, n),
                None => archive.clone(),
            };
            Ok(ok_response(url, body, &[("content-type", WHEEL_CONTENT_TYPE)]))
        })
    }

    fn downloader(session: MockSession, config: FetchConfig) -> Downloader<MockSession> {
        Downloader::new(session, config)
            .with_renderer(Arc::new(RecordingRenderer::default()))
            .with_log_level(LevelFilter::INFO)
    }

    fn wheel() -> ArtifactReference {
        ArtifactReference::parse(WHEEL_URL).unwrap()
    }

    #[test]
    fn test_found_in_first_window() {
        let temp = TempDir::new().unwrap();
        let archive = build_wheel(3, 100);
        let probe = downloader(range_server(archive.clone()), FetchConfig::default());

        let download = probe.probe(&wheel(), temp.path()).unwrap();

        assert_eq!(probe.session.request_count(), 1);
        assert_eq!(probe.session.requested_windows(), vec![Some(8000)]);
        assert_eq!(download.content_type, WHEEL_CONTENT_TYPE);
        assert_eq!(download.path, temp.path().join("demo-1.0-py3-none-any.whl"));
        // Archive is smaller than the window, so it arrives whole.
        assert_eq!(fs::read(&download.path).unwrap(), archive);
    }

    #[test]
    fn test_window_doubles_until_directory_fits() {
        let temp = TempDir::new().unwrap();
        let archive = build_wheel(400, 200_000);
        let needed = directory_len(&archive);
        assert!(needed > 8000, "fixture directory too small: {}", needed);

        let probe = downloader(range_server(archive.clone()), FetchConfig::default());
        let download = probe.probe(&wheel(), temp.path()).unwrap();

        let windows: Vec<u64> = probe
            .session
            .requested_windows()
            .into_iter()
            .map(|w| w.unwrap())
            .collect();
        let expected_calls = (needed as f64 / 8000.0).log2().ceil() as usize + 1;
        assert_eq!(windows.len(), expected_calls);
        for pair in windows.windows(2) {
            assert_eq!(pair[1], pair[0] * 2);
        }
        assert!(*windows.last().unwrap() >= needed);

        let on_disk = fs::read(&download.path).unwrap();
        assert_eq!(on_disk, tail(&archive, *windows.last().unwrap()));
        assert!(on_disk.len() < archive.len());
    }

    #[test]
    fn test_retry_count_for_threshold() {
        let archive = build_wheel(2, 10);

        for threshold in [8000u64, 8001, 16_000, 50_000, 100_000] {
            let temp = TempDir::new().unwrap();
            let good = archive.clone();
            let session = MockSession::new(move |url, headers| {
                let body = match tail_len(headers) {
                    Some(n) if n >= threshold => good.clone(),
                    _ => b"<html>not an archive</html>".to_vec(),
                };
                Ok(ok_response(url, body, &[("content-type", WHEEL_CONTENT_TYPE)]))
            });

            let probe = downloader(session, FetchConfig::default());
            let download = probe.probe(&wheel(), temp.path()).unwrap();

            let retries = (threshold as f64 / 8000.0).log2().ceil() as usize;
            assert_eq!(probe.session.request_count(), retries + 1, "threshold {}", threshold);
            assert_eq!(download.content_type, WHEEL_CONTENT_TYPE);
            assert_eq!(fs::read(&download.path).unwrap(), archive);
        }
    }

    #[test]
    fn test_missing_metadata_hits_cap() {
        let temp = TempDir::new().unwrap();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("demo/__init__.py", FileOptions::default())
            .unwrap();
        let archive = writer.finish().unwrap().into_inner();

        let config = FetchConfig::default().with_max_probe_window(Some(32_000));
        let probe = downloader(range_server(archive), config);

        match probe.probe(&wheel(), temp.path()) {
            Err(FetchError::ProbeExhausted { window, .. }) => assert_eq!(window, 32_000),
            other => panic!("Expected ProbeExhausted, got {:?}", other),
        }
        assert_eq!(
            probe.session.requested_windows(),
            vec![Some(8000), Some(16_000), Some(32_000)]
        );
    }

    #[test]
    fn test_cap_below_first_window_sends_nothing() {
        let temp = TempDir::new().unwrap();
        let session = MockSession::serving(build_wheel(1, 10), vec![]);
        let config = FetchConfig::default().with_max_probe_window(Some(4000));
        let probe = downloader(session, config);

        let result = probe.probe(&wheel(), temp.path());
        assert!(matches!(result, Err(FetchError::InvalidConfig(_))));
        assert_eq!(probe.session.request_count(), 0);
    }

    #[test]
    fn test_window_overflow_is_exhausted() {
        let temp = TempDir::new().unwrap();
        let session = MockSession::serving(b"junk".to_vec(), vec![]);
        let config = FetchConfig::default().with_initial_probe_window(u64::MAX / 2 + 1);
        let probe = downloader(session, config);

        let result = probe.probe(&wheel(), temp.path());
        assert!(matches!(result, Err(FetchError::ProbeExhausted { .. })));
        assert_eq!(probe.session.request_count(), 1);
    }

    #[test]
    fn test_retry_overwrites_partial_file() {
        let temp = TempDir::new().unwrap();
        let archive = build_wheel(1, 10);
        let good = archive.clone();
        let session = MockSession::new(move |url, headers| {
            let body = match tail_len(headers) {
                Some(n) if n >= 16_000 => good.clone(),
                _ => vec![0xAA; 20_000],
            };
            Ok(ok_response(url, body, &[]))
        });

        let probe = downloader(session, FetchConfig::default());
        let download = probe.probe(&wheel(), temp.path()).unwrap();

        assert_eq!(fs::read(&download.path).unwrap(), archive);
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_renamed_partial_file_is_removed() {
        let temp = TempDir::new().unwrap();
        let archive = build_wheel(1, 10);
        let good = archive.clone();
        let session = MockSession::new(move |url, headers| {
            let (body, disposition) = match tail_len(headers) {
                Some(n) if n >= 16_000 => (good.clone(), "attachment; filename=\"final.whl\""),
                _ => (b"junk".to_vec(), "attachment; filename=\"first.whl\""),
            };
            Ok(ok_response(url, body, &[("content-disposition", disposition)]))
        });

        let probe = downloader(session, FetchConfig::default());
        let download = probe.probe(&wheel(), temp.path()).unwrap();

        assert_eq!(download.path, temp.path().join("final.whl"));
        assert!(!temp.path().join("first.whl").exists());
    }

    #[test]
    fn test_http_error_during_probe() {
        let temp = TempDir::new().unwrap();
        let session = MockSession::new(|url, _| {
            Ok(HttpResponse::new(
                ResponseMetadata::new(StatusCode::RANGE_NOT_SATISFIABLE, HeaderMap::new(), url),
                Cursor::new(Vec::new()),
            ))
        });
        let probe = downloader(session, FetchConfig::default());

        let result = probe.probe(&wheel(), temp.path());
        assert!(matches!(result, Err(FetchError::HttpStatus { status: 416, .. })));
        assert_eq!(probe.session.request_count(), 1);
    }

    #[test]
    fn test_check_metadata_outcomes() {
        let temp = TempDir::new().unwrap();

        let good = temp.path().join("good.whl");
        fs::write(&good, build_wheel(0, 1)).unwrap();
        assert!(matches!(check_metadata(&good), Ok(ProbeOutcome::Found)));

        let junk = temp.path().join("junk.whl");
        fs::write(&junk, b"junk").unwrap();
        assert!(matches!(check_metadata(&junk), Ok(ProbeOutcome::NotYet(_))));

        let missing = temp.path().join("missing.whl");
        assert!(matches!(check_metadata(&missing), Err(FetchError::ReadFailed { .. })));
    }
}
