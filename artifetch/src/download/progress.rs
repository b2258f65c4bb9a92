//! Progress decision and progress rendering for chunk streams.
//!
//! Rendering is behind the [`ProgressRenderer`] trait so the downloader can be
//! driven by a terminal bar in the CLI and by a recording sink in tests.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::level_filters::LevelFilter;

use crate::error::FetchResult;
use crate::http::ResponseMetadata;

/// Responses at or below this many bytes never get a progress bar.
pub const PROGRESS_THRESHOLD: u64 = 40_000;

/// Spinner tick interval for downloads of unknown size.
const SPINNER_TICK: Duration = Duration::from_millis(100);

/// How download progress is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressBarStyle {
    /// Never draw anything.
    Off,
    /// Default bar.
    #[default]
    On,
    /// Plain ASCII characters only.
    Ascii,
    /// Unicode block characters.
    Pretty,
    /// Emoji bar.
    Emoji,
}

impl ProgressBarStyle {
    /// Configuration token for this style.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Ascii => "ascii",
            Self::Pretty => "pretty",
            Self::Emoji => "emoji",
        }
    }
}

impl fmt::Display for ProgressBarStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressBarStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            "ascii" => Ok(Self::Ascii),
            "pretty" => Ok(Self::Pretty),
            "emoji" => Ok(Self::Emoji),
            other => Err(format!(
                "unknown progress bar style {:?} (expected off, on, ascii, pretty or emoji)",
                other
            )),
        }
    }
}

/// Receives progress updates for one download.
pub trait ProgressSink: Send {
    /// Record `bytes` more bytes as received.
    fn advance(&mut self, bytes: u64);

    /// The stream is exhausted.
    fn finish(&mut self);

    /// The stream stopped early, usually on an error.
    fn abandon(&mut self) {
        self.finish();
    }
}

/// Creates a progress sink per download.
pub trait ProgressRenderer: Send + Sync {
    /// Start displaying progress. `total` is `None` when the size is unknown.
    fn begin(&self, style: ProgressBarStyle, total: Option<u64>) -> Box<dyn ProgressSink>;
}

/// Decide whether a download deserves a progress display.
///
/// Small and cached responses finish too quickly to be worth it, and nothing
/// is drawn when informational output is filtered out. An unknown size
/// always gets an (indeterminate) display.
pub fn should_show_progress(
    meta: &ResponseMetadata,
    total_size: Option<u64>,
    log_level: LevelFilter,
) -> bool {
    if log_level < LevelFilter::INFO || meta.from_cache {
        return false;
    }

    match total_size {
        None => true,
        Some(total) => total > PROGRESS_THRESHOLD,
    }
}

/// Iterator adaptor that reports every chunk it passes through.
///
/// Chunks are yielded unmodified. The sink sees one `advance` per successful
/// chunk and exactly one `finish` once the inner iterator is exhausted. A
/// stream dropped before that is reported with `abandon` instead.
pub struct ProgressChunks<I> {
    inner: I,
    sink: Box<dyn ProgressSink>,
    finished: bool,
}

impl<I> ProgressChunks<I>
where
    I: Iterator<Item = FetchResult<Vec<u8>>>,
{
    pub fn new(inner: I, sink: Box<dyn ProgressSink>) -> Self {
        Self {
            inner,
            sink,
            finished: false,
        }
    }
}

impl<I> Iterator for ProgressChunks<I>
where
    I: Iterator<Item = FetchResult<Vec<u8>>>,
{
    type Item = FetchResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(Ok(chunk)) => {
                self.sink.advance(chunk.len() as u64);
                Some(Ok(chunk))
            }
            Some(Err(e)) => Some(Err(e)),
            None => {
                self.finished = true;
                self.sink.finish();
                None
            }
        }
    }
}

impl<I> Drop for ProgressChunks<I> {
    fn drop(&mut self) {
        if !self.finished {
            self.finished = true;
            self.sink.abandon();
        }
    }
}

/// Terminal progress bars drawn with `indicatif` on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatifRenderer;

impl IndicatifRenderer {
    pub fn new() -> Self {
        Self
    }

    fn bar(style: ProgressBarStyle, total: u64) -> ProgressBar {
        let (template, chars) = match style {
            ProgressBarStyle::Ascii => ("{bar:40} {bytes}/{total_bytes} {bytes_per_sec} eta {eta}", "#>-"),
            ProgressBarStyle::Pretty => (
                "{bar:40.green/black} {bytes}/{total_bytes} {bytes_per_sec} eta {eta}",
                "━╸━",
            ),
            ProgressBarStyle::Emoji => ("{bar:40} {bytes}/{total_bytes} {bytes_per_sec} eta {eta}", "🟩🟨⬜"),
            ProgressBarStyle::On | ProgressBarStyle::Off => (
                "[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                "█▉▊▋▌▍▎▏  ",
            ),
        };

        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(chars);

        ProgressBar::new(total).with_style(style)
    }

    fn spinner(style: ProgressBarStyle) -> ProgressBar {
        let ticks = match style {
            ProgressBarStyle::Ascii => "|/-\\ ",
            ProgressBarStyle::Emoji => "🌑🌒🌓🌔🌕🌖🌗🌘 ",
            _ => "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ",
        };

        let style = ProgressStyle::with_template("{spinner} {bytes} {bytes_per_sec} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(ticks);

        let spinner = ProgressBar::new_spinner().with_style(style);
        spinner.enable_steady_tick(SPINNER_TICK);
        spinner
    }
}

impl ProgressRenderer for IndicatifRenderer {
    fn begin(&self, style: ProgressBarStyle, total: Option<u64>) -> Box<dyn ProgressSink> {
        let bar = match (style, total) {
            (ProgressBarStyle::Off, _) => ProgressBar::hidden(),
            (_, Some(total)) => Self::bar(style, total),
            (_, None) => Self::spinner(style),
        };
        Box::new(IndicatifSink(bar))
    }
}

struct IndicatifSink(ProgressBar);

impl ProgressSink for IndicatifSink {
    fn advance(&mut self, bytes: u64) {
        self.0.inc(bytes);
    }

    fn finish(&mut self) {
        self.0.finish();
    }

    fn abandon(&mut self) {
        self.0.abandon();
    }
}
