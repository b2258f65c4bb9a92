//! Blocking `reqwest` session.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::HeaderMap;

use super::{HttpResponse, HttpSession, ResponseMetadata};
use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use crate::util::redact_auth_from_url;

/// Real HTTP session implementation using reqwest.
///
/// `reqwest` keeps no local HTTP cache, so responses are never reported as
/// served from cache.
#[derive(Debug, Clone)]
pub struct ReqwestSession {
    client: Client,
    timeout: Duration,
}

impl ReqwestSession {
    /// Creates a new session with the timeout and user agent of `config`.
    pub fn new(config: &FetchConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::InvalidConfig(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HttpSession for ReqwestSession {
    fn get(&self, url: &str, headers: &HeaderMap) -> FetchResult<HttpResponse> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .map_err(|e| {
                let url = redact_auth_from_url(url);
                if e.is_timeout() {
                    FetchError::Timeout {
                        url,
                        timeout_secs: self.timeout.as_secs(),
                    }
                } else {
                    FetchError::Transport {
                        url,
                        reason: e.to_string(),
                    }
                }
            })?;

        let meta = ResponseMetadata::new(
            response.status(),
            response.headers().clone(),
            response.url().as_str(),
        );

        Ok(HttpResponse::new(meta, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_uses_config_timeout() {
        let config = FetchConfig::default().with_timeout(Duration::from_secs(60));
        let session = ReqwestSession::new(&config).unwrap();
        assert_eq!(session.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_unreachable_host_is_transport_error() {
        let config = FetchConfig::default().with_timeout(Duration::from_secs(2));
        let session = ReqwestSession::new(&config).unwrap();

        // Port 9 on localhost (discard) is closed on test machines.
        let result = session.get("http://127.0.0.1:9/pkg.whl", &HeaderMap::new());
        assert!(matches!(
            result,
            Err(FetchError::Transport { .. }) | Err(FetchError::Timeout { .. })
        ));
    }
}
