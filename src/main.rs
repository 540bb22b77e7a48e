//! API conformance CLI
//!
//! Runs the shared YAML test corpus against a live service and reports
//! which actions did not behave as documented.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use conformance::common::{config::Config, logging};
use conformance::{cli, commands};

#[derive(Parser)]
#[command(name = "conformance", about = "YAML API conformance test runner")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Exit code after an interrupt
const INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = tokio::select! {
        result = cli::dispatch(cli.command, config) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted");
            std::process::exit(INTERRUPTED);
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
