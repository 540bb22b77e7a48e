//! Progress and summary output
//!
//! The runner and test cases write events to a [`Reporter`]; they never
//! print on their own.

use std::time::Duration;

use colored::Colorize;

use super::action::Action;
use super::case::TestCase;
use super::document::Requirement;
use super::runner::RunSummary;
use crate::client::Response;
use crate::common::Error;

/// Sink for test progress events
pub trait Reporter: Send + Sync {
    /// A document was skipped because its requirement does not match
    fn document_skipped(&self, _file: &str, _requirement: &Requirement) {}

    /// A test case is about to run
    fn case_started(&self, _case: &TestCase) {}

    /// An action succeeded
    fn action_passed(&self, _case: &TestCase, _action: &Action, _response: Option<&Response>) {}

    /// An action failed; the error propagates after this call
    fn action_failed(&self, _case: &TestCase, _action: &Action, _error: &Error) {}

    /// The run finished
    fn summary(&self, _summary: &RunSummary) {}
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Colored terminal output
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter {
    /// One mark per action instead of one line
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Quiet mode unless `QUIET` is unset, `false` or empty
    pub fn from_env() -> Self {
        let quiet = std::env::var("QUIET")
            .map(|v| !v.is_empty() && v != "false")
            .unwrap_or(false);
        Self::new(quiet)
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

impl Reporter for ConsoleReporter {
    fn document_skipped(&self, file: &str, requirement: &Requirement) {
        if !self.quiet {
            println!(
                "{} {} (requires {})",
                "-".dimmed(),
                file.yellow(),
                requirement.to_string().dimmed()
            );
        }
    }

    fn case_started(&self, case: &TestCase) {
        if !self.quiet {
            println!("\n{} {}", case.source().yellow(), case.title().white().bold());
        }
    }

    fn action_passed(&self, _case: &TestCase, action: &Action, response: Option<&Response>) {
        if self.quiet {
            print!("{}", ".".green());
            return;
        }
        let status = match response {
            Some(Response::Api(api)) => api.status.to_string(),
            Some(Response::Boolean(b)) => b.to_string(),
            None => "-".to_string(),
        };
        println!(
            "  {} {} {} [{}]",
            "✓".green(),
            action.to_string().dimmed(),
            "passed".green(),
            status
        );
    }

    fn action_failed(&self, _case: &TestCase, action: &Action, error: &Error) {
        if self.quiet {
            print!("{}", "F".red());
            return;
        }
        println!("  {} {} {}", "✗".red(), action.to_string().dimmed(), "failed".red());
        if let Some(first_line) = error.root().to_string().lines().next() {
            println!("    {}", first_line.red());
        }
    }

    fn summary(&self, summary: &RunSummary) {
        if self.quiet {
            println!();
        }

        if !summary.failures.is_empty() {
            println!(
                "\n{}",
                format!("Errors/Failures: {}", summary.failures.len()).red().bold()
            );
            for failure in &summary.failures {
                println!("\n  {} {}", "Test:".bold(), failure.file);
                if let Some(title) = &failure.test {
                    println!("  {} {}", "Case:".bold(), title);
                }
                if let Some(action) = failure.error.action() {
                    println!("  {} {}", "Action:".bold(), action);
                }
                let kind = if failure.error.is_failure() {
                    "Failure"
                } else {
                    "Error"
                };
                println!("  {} {}", format!("{}:", kind).bold(), failure.error.root());
            }
        }

        let line = format!(
            "Tests: {} | Passed: {} | Failed: {}",
            summary.tests,
            summary.passed(),
            summary.failures.len()
        );
        println!("\n{}", "[SUMMARY]".cyan().bold());
        if summary.success() {
            println!("{}", line.green().bold());
        } else {
            println!("{}", line.red().bold());
        }
        println!("Elapsed time: {}", format_elapsed(summary.elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "01:02:03");
    }

    #[test]
    fn test_quiet_flag() {
        assert!(ConsoleReporter::new(true).quiet);
        assert!(!ConsoleReporter::default().quiet);
    }
}
