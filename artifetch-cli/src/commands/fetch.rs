//! Fetch command - download one artifact.

use std::path::PathBuf;
use std::time::Duration;

use artifetch::download::{Download, Downloader};
use artifetch::http::ReqwestSession;
use artifetch::{ArtifactReference, FetchConfig, Hashes};
use clap::Args;

use super::common::{load_config, ProgressBarArg};
use crate::error::CliError;

/// Arguments of the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Artifact URL
    pub url: String,

    /// Directory to write the artifact to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub dest: PathBuf,

    /// Expected digest as ALG:HEX (repeatable; any match passes)
    #[arg(long = "hash", value_name = "ALG:HEX")]
    pub hashes: Vec<String>,

    /// Progress bar style
    #[arg(long, value_enum)]
    pub progress_bar: Option<ProgressBarArg>,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Always download the full file, even for wheels
    #[arg(long)]
    pub no_probe: bool,

    /// Largest tail window a metadata probe may request
    #[arg(long, value_name = "BYTES")]
    pub max_probe_window: Option<u64>,

    /// Config file (default: <config dir>/artifetch/config.ini)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl FetchArgs {
    /// Apply command line overrides on top of the loaded configuration.
    pub fn apply(&self, mut config: FetchConfig) -> FetchConfig {
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(style) = self.progress_bar {
            config = config.with_progress_bar(style.into());
        }
        if self.max_probe_window.is_some() {
            config = config.with_max_probe_window(self.max_probe_window);
        }
        config
    }
}

/// Run the fetch command.
pub fn run(args: FetchArgs) -> Result<Download, CliError> {
    let config = args.apply(load_config(args.config.as_deref())?).validate()?;
    let hashes = Hashes::parse(args.hashes.iter().map(String::as_str))?;

    let mut reference = ArtifactReference::parse(&args.url)?;
    if args.no_probe {
        reference = reference.with_container_archive(false);
    }

    let session = ReqwestSession::new(&config)?;
    let downloader = Downloader::new(session, config);
    let download = downloader.download_file(&reference, &args.dest, Some(&hashes))?;
    Ok(download)
}
