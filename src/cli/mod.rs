//! CLI command handling
//!
//! Builds the client and runner from configuration and command-line
//! overrides, then hands control to them.

use std::sync::Arc;

use crate::client::HttpClient;
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::Result;
use crate::fetch;
use crate::testing::{ConsoleReporter, TestRunner};

/// Dispatch a CLI command
///
/// Returns whether the command succeeded; a run with failing tests is
/// `Ok(false)`.
pub async fn dispatch(command: Commands, config: Config) -> Result<bool> {
    match command {
        Commands::Run {
            paths,
            tests_path,
            skip,
            flavor,
            url,
            quiet,
        } => {
            let flavor = flavor.or_else(|| config.flavor_override());
            let tests_path = tests_path.unwrap_or_else(|| config.run.tests_path.clone());

            let mut client_config = config.client;
            if let Some(url) = url {
                client_config.url = url;
            }
            tracing::debug!(url = %client_config.url, "connecting");
            let client = HttpClient::new(client_config, config.endpoints)?;

            let reporter = if quiet {
                ConsoleReporter::new(true)
            } else {
                ConsoleReporter::from_env()
            };

            let mut runner = TestRunner::new(Arc::new(client), tests_path)
                .with_flavor(flavor)
                .with_reporter(Arc::new(reporter));
            runner.add_tests_to_skip(config.run.skip.iter().chain(skip.iter()));

            let summary = runner.run(&paths).await?;
            Ok(summary.success())
        }

        Commands::Fetch { dest, url } => {
            let dest = dest.unwrap_or(config.run.tests_path);
            println!("Downloading test corpus to {}", dest.display());
            let count = fetch::run(&dest, &url).await?;
            println!("Fetched {} test files", count);
            Ok(true)
        }
    }
}
