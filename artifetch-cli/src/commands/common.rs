//! Config resolution shared by CLI commands.

use std::path::{Path, PathBuf};

use artifetch::download::ProgressBarStyle;
use artifetch::FetchConfig;
use clap::ValueEnum;

use crate::error::CliError;

/// Progress bar selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ProgressBarArg {
    /// No progress display
    Off,
    /// Default bar
    On,
    /// ASCII-only bar
    Ascii,
    /// Unicode block bar
    Pretty,
    /// Emoji bar
    Emoji,
}

impl From<ProgressBarArg> for ProgressBarStyle {
    fn from(arg: ProgressBarArg) -> Self {
        match arg {
            ProgressBarArg::Off => ProgressBarStyle::Off,
            ProgressBarArg::On => ProgressBarStyle::On,
            ProgressBarArg::Ascii => ProgressBarStyle::Ascii,
            ProgressBarArg::Pretty => ProgressBarStyle::Pretty,
            ProgressBarArg::Emoji => ProgressBarStyle::Emoji,
        }
    }
}

/// Default config file location: `<config dir>/artifetch/config.ini`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("artifetch").join("config.ini"))
}

/// Load the configuration.
///
/// An explicitly given file must exist. The default file is optional and
/// built-in defaults apply when it is missing.
pub fn load_config(explicit: Option<&Path>) -> Result<FetchConfig, CliError> {
    let path = match explicit {
        Some(path) if !path.is_file() => {
            return Err(CliError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => path,
            None => return Ok(FetchConfig::default()),
        },
    };

    tracing::debug!(path = %path.display(), "Loading config");
    Ok(FetchConfig::from_ini_file(&path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_progress_bar_conversion() {
        assert_eq!(ProgressBarStyle::from(ProgressBarArg::Off), ProgressBarStyle::Off);
        assert_eq!(ProgressBarStyle::from(ProgressBarArg::Emoji), ProgressBarStyle::Emoji);
    }

    #[test]
    fn test_load_explicit_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[download]\ntimeout = 42\nprogress_bar = ascii").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.timeout.as_secs(), 42);
        assert_eq!(config.progress_bar, ProgressBarStyle::Ascii);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/artifetch.ini")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_invalid_config_value() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[download]\nchunk_size = lots").unwrap();

        let result = load_config(Some(file.path()));
        assert!(matches!(result, Err(CliError::Fetch(_))));
    }
}
