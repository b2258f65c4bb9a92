//! HTTP session abstraction for testability.
//!
//! The downloader only needs a blocking GET that hands back status, headers,
//! the final URL and a body reader. Everything else (pooling, TLS, retries,
//! auth) belongs to the session implementation.

mod client;

use std::fmt;
use std::io::Read;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_TYPE, RANGE};
use reqwest::StatusCode;

use crate::error::FetchResult;

pub use client::ReqwestSession;

/// Trait for HTTP session operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock sessions in tests.
pub trait HttpSession: Send + Sync {
    /// Performs a streaming HTTP GET request.
    ///
    /// Implementations return the response whatever its status; the caller
    /// decides how to treat non-success codes.
    fn get(&self, url: &str, headers: &HeaderMap) -> FetchResult<HttpResponse>;
}

impl<S: HttpSession + ?Sized> HttpSession for &S {
    fn get(&self, url: &str, headers: &HeaderMap) -> FetchResult<HttpResponse> {
        (**self).get(url, headers)
    }
}

/// Read-only view over the metadata of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Final URL after redirects.
    pub url: String,
    /// Whether the response was served from a local HTTP cache.
    pub from_cache: bool,
}

impl ResponseMetadata {
    /// Create metadata for a network (non-cached) response.
    pub fn new(status: StatusCode, headers: HeaderMap, url: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            url: url.into(),
            from_cache: false,
        }
    }

    /// Mark the response as served from cache.
    pub fn with_from_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = from_cache;
        self
    }

    /// The `Content-Type` header, or an empty string.
    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

/// A response with a blocking body reader.
pub struct HttpResponse {
    /// Status, headers and final URL.
    pub meta: ResponseMetadata,
    /// Response body.
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// Create a response from metadata and a body reader.
    pub fn new(meta: ResponseMetadata, body: impl Read + Send + 'static) -> Self {
        Self {
            meta,
            body: Box::new(body),
        }
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Request headers for a full download.
///
/// Identity encoding keeps servers from compressing (or double compressing)
/// files that are already archives, so the bytes on disk are the artifact.
pub fn identity_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    headers
}

/// Request headers for the trailing `size` bytes of a resource.
pub fn tail_range_headers(size: u64) -> HeaderMap {
    let mut headers = identity_headers();
    // Digits and ASCII punctuation only, so this never fails.
    if let Ok(value) = HeaderValue::from_str(&format!("bytes=-{}", size)) {
        headers.insert(RANGE, value);
    }
    headers
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    use crate::error::FetchError;

    type Responder = Box<dyn Fn(&str, &HeaderMap) -> FetchResult<HttpResponse> + Send + Sync>;

    /// Mock HTTP session for testing.
    ///
    /// Records every request and answers through a closure.
    pub struct MockSession {
        responder: Responder,
        pub requests: Mutex<Vec<(String, HeaderMap)>>,
    }

    impl MockSession {
        pub fn new(
            responder: impl Fn(&str, &HeaderMap) -> FetchResult<HttpResponse> + Send + Sync + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Always answer 200 with the given body and headers.
        pub fn serving(body: Vec<u8>, headers: Vec<(&'static str, &'static str)>) -> Self {
            Self::new(move |url, _| Ok(ok_response(url, body.clone(), &headers)))
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requested_windows(&self) -> Vec<Option<u64>> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(_, h)| tail_len(h))
                .collect()
        }
    }

    impl HttpSession for MockSession {
        fn get(&self, url: &str, headers: &HeaderMap) -> FetchResult<HttpResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), headers.clone()));
            (self.responder)(url, headers)
        }
    }

    /// Suffix length of a `Range: bytes=-N` request header.
    pub fn tail_len(headers: &HeaderMap) -> Option<u64> {
        headers
            .get(RANGE)?
            .to_str()
            .ok()?
            .strip_prefix("bytes=-")?
            .parse()
            .ok()
    }

    pub fn ok_response(url: &str, body: Vec<u8>, headers: &[(&'static str, &'static str)]) -> HttpResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        HttpResponse::new(ResponseMetadata::new(StatusCode::OK, map, url), Cursor::new(body))
    }

    #[test]
    fn test_identity_headers() {
        let headers = identity_headers();
        assert_eq!(headers.get(ACCEPT_ENCODING).unwrap(), "identity");
        assert!(headers.get(RANGE).is_none());
    }

    #[test]
    fn test_tail_range_headers() {
        let headers = tail_range_headers(8000);
        assert_eq!(headers.get(ACCEPT_ENCODING).unwrap(), "identity");
        assert_eq!(headers.get(RANGE).unwrap(), "bytes=-8000");
        assert_eq!(tail_len(&headers), Some(8000));
    }

    #[test]
    fn test_tail_range_doubles_cleanly() {
        let headers = tail_range_headers(8000 * 2 * 2 * 2);
        assert_eq!(headers.get(RANGE).unwrap(), "bytes=-64000");
    }

    #[test]
    fn test_metadata_content_type_default() {
        let meta = ResponseMetadata::new(StatusCode::OK, HeaderMap::new(), "http://a/b");
        assert_eq!(meta.content_type(), "");
        assert!(!meta.from_cache);
        assert!(meta.with_from_cache(true).from_cache);
    }

    #[test]
    fn test_mock_session_records_requests() {
        let mock = MockSession::serving(vec![1, 2, 3], vec![("content-type", "text/plain")]);
        let response = mock.get("http://example.com/a", &identity_headers()).unwrap();
        assert_eq!(response.meta.content_type(), "text/plain");
        assert_eq!(mock.request_count(), 1);
        assert_eq!(mock.requested_windows(), vec![None]);
    }

    #[test]
    fn test_mock_session_error() {
        let mock = MockSession::new(|url, _| {
            Err(FetchError::Transport {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        });
        assert!(mock.get("http://example.com", &HeaderMap::new()).is_err());
    }
}
