//! CLI command definitions
//!
//! Defines the clap commands for the conformance CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::client::Flavor;
use crate::fetch::CORPUS_URL;

#[derive(Subcommand)]
pub enum Commands {
    /// Run YAML test documents against the service
    Run {
        /// Test files or directories, relative to the tests root (default: everything)
        paths: Vec<String>,

        /// Root directory of the test corpus
        #[arg(long)]
        tests_path: Option<PathBuf>,

        /// Skip test files matching a pattern
        /// Can be specified multiple times: --skip 'cat\..*' --skip ml/
        #[arg(long)]
        skip: Vec<String>,

        /// Run as if the service were this flavor (stack or serverless)
        #[arg(long)]
        flavor: Option<Flavor>,

        /// Base URL of the service
        #[arg(long)]
        url: Option<String>,

        /// Print one mark per action instead of one line
        #[arg(long, short)]
        quiet: bool,
    },

    /// Download the test corpus, replacing the tests directory
    Fetch {
        /// Destination directory (default: configured tests path)
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Zip archive to download
        #[arg(long, default_value = CORPUS_URL)]
        url: String,
    },
}
