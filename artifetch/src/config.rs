//! Configuration for the downloader.
//!
//! Values come from [`FetchConfig::default`], can be loaded from the
//! `[download]` section of an INI file, and are adjusted with the builder
//! methods.
//!
//! ```ini
//! [download]
//! timeout = 30
//! progress_bar = pretty
//! initial_probe_window = 8000
//! max_probe_window = 4000000
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use crate::download::ProgressBarStyle;
use crate::error::{FetchError, FetchResult};

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Bytes read from the response body per chunk (10 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024;

/// First tail window requested when probing an archive for metadata.
pub const DEFAULT_PROBE_WINDOW: u64 = 8000;

/// Host serving package files whose long URLs are logged by basename only.
pub const DEFAULT_FILE_STORAGE_DOMAIN: &str = "files.pythonhosted.org";

const SECTION: &str = "download";

/// Configuration for the downloader.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// HTTP request timeout.
    pub timeout: Duration,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Size of the chunks read from a response body.
    pub chunk_size: usize,

    /// Tail window of the first metadata probe.
    pub initial_probe_window: u64,

    /// Largest tail window the probe may request.
    ///
    /// `None` keeps doubling until the metadata entry shows up or the
    /// transport fails.
    pub max_probe_window: Option<u64>,

    /// Progress bar style.
    pub progress_bar: ProgressBarStyle,

    /// Host whose artifacts are logged by their short name.
    pub file_storage_domain: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("artifetch/{}", env!("CARGO_PKG_VERSION")),
            chunk_size: DEFAULT_CHUNK_SIZE,
            initial_probe_window: DEFAULT_PROBE_WINDOW,
            max_probe_window: None,
            progress_bar: ProgressBarStyle::default(),
            file_storage_domain: DEFAULT_FILE_STORAGE_DOMAIN.to_string(),
        }
    }
}

impl FetchConfig {
    /// Load configuration from an INI file, starting from the defaults.
    pub fn from_ini_file(path: &Path) -> FetchResult<Self> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| FetchError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::default().merge_ini(&ini)
    }

    /// Load configuration from INI text, starting from the defaults.
    pub fn from_ini_str(text: &str) -> FetchResult<Self> {
        let ini = Ini::load_from_str(text).map_err(|e| FetchError::InvalidConfig(e.to_string()))?;
        Self::default().merge_ini(&ini)
    }

    /// Override fields with the values present in the `[download]` section.
    fn merge_ini(mut self, ini: &Ini) -> FetchResult<Self> {
        let Some(section) = ini.section(Some(SECTION)) else {
            return Ok(self);
        };

        if let Some(value) = section.get("timeout") {
            self.timeout = Duration::from_secs(parse_value("timeout", value)?);
        }
        if let Some(value) = section.get("user_agent") {
            self.user_agent = value.trim().to_string();
        }
        if let Some(value) = section.get("chunk_size") {
            self.chunk_size = parse_value("chunk_size", value)?;
        }
        if let Some(value) = section.get("initial_probe_window") {
            self.initial_probe_window = parse_value("initial_probe_window", value)?;
        }
        if let Some(value) = section.get("max_probe_window") {
            self.max_probe_window = match value.trim() {
                "" | "none" | "unlimited" => None,
                other => Some(parse_value("max_probe_window", other)?),
            };
        }
        if let Some(value) = section.get("progress_bar") {
            self.progress_bar = parse_value("progress_bar", value)?;
        }
        if let Some(value) = section.get("file_storage_domain") {
            self.file_storage_domain = value.trim().to_string();
        }

        self.validate()
    }

    /// Check invariants the downloader relies on.
    pub fn validate(self) -> FetchResult<Self> {
        if self.chunk_size == 0 {
            return Err(FetchError::InvalidConfig("chunk_size must be positive".to_string()));
        }
        if self.initial_probe_window == 0 {
            return Err(FetchError::InvalidConfig(
                "initial_probe_window must be positive".to_string(),
            ));
        }
        if let Some(max) = self.max_probe_window.filter(|max| *max < self.initial_probe_window) {
            return Err(FetchError::InvalidConfig(format!(
                "max_probe_window ({}) is smaller than initial_probe_window ({})",
                max, self.initial_probe_window
            )));
        }
        Ok(self)
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the body chunk size (minimum 1).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the first probe window (minimum 1).
    pub fn with_initial_probe_window(mut self, window: u64) -> Self {
        self.initial_probe_window = window.max(1);
        self
    }

    /// Cap the probe window.
    pub fn with_max_probe_window(mut self, window: Option<u64>) -> Self {
        self.max_probe_window = window;
        self
    }

    /// Set the progress bar style.
    pub fn with_progress_bar(mut self, style: ProgressBarStyle) -> Self {
        self.progress_bar = style;
        self
    }

    /// Set the file storage domain.
    pub fn with_file_storage_domain(mut self, domain: impl Into<String>) -> Self {
        self.file_storage_domain = domain.into();
        self
    }
}

fn parse_value<T>(key: &str, value: &str) -> FetchResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| FetchError::InvalidConfig(format!("{} = {:?}: {}", key, value, e)))
}
