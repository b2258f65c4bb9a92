//! artifetch CLI - Command-line interface
//!
//! Downloads one artifact and prints `<path>\t<content-type>` on success.

mod commands;
mod error;

use std::error::Error;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use artifetch::logging::{init_logging, LogOptions};
use clap::Parser;

use commands::fetch::{self, FetchArgs};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "artifetch")]
#[command(version, about = "Fetch package artifacts, probing wheels for metadata with tail range requests")]
struct Cli {
    #[command(flatten)]
    fetch: FetchArgs,

    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let options = LogOptions::from_verbosity(cli.verbose, cli.quiet)
        .with_log_file(cli.log_file)
        .with_ansi(std::io::stderr().is_terminal());
    let _guard = init_logging(&options)?;

    let download = fetch::run(cli.fetch)?;
    println!("{}\t{}", download.path.display(), download.content_type);
    Ok(())
}
