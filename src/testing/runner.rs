//! Test runner implementation
//!
//! Selects test files under the corpus root, skips those whose requirement
//! does not match the service flavor, and runs every test case in order.
//! A failing case is recorded and the run moves on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use walkdir::WalkDir;

use super::document::TestDocument;
use super::report::{NullReporter, Reporter};
use crate::client::{ApiClient, Flavor};
use crate::common::paths::test_identifier;
use crate::common::{Error, Result};

/// A test case or document that did not pass
#[derive(Debug)]
pub struct Failure {
    /// Identifier of the test file
    pub file: String,
    /// Title of the failing test, when the document got that far
    pub test: Option<String>,
    pub error: Error,
}

/// Result of a run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// `do` actions in the bodies of executed test cases
    pub tests: usize,
    pub failures: Vec<Failure>,
    /// Documents whose requirement did not match
    pub skipped_documents: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.tests.saturating_sub(self.failures.len())
    }

    /// True when nothing failed
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yml" || ext == "yaml")
}

fn yaml_files(dir: &Path, max_depth: usize) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_yaml(e.path()))
        .map(|e| e.into_path())
        .collect()
}

/// Skip-list entry: a regex, or the escaped text when it is not one
fn skip_pattern(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| {
        Regex::new(&regex::escape(pattern)).expect("escaped pattern is a valid regex")
    })
}

/// Runs YAML test documents against a client
pub struct TestRunner {
    client: Arc<dyn ApiClient>,
    path: PathBuf,
    flavor: Flavor,
    tests_to_skip: Vec<Regex>,
    reporter: Arc<dyn Reporter>,
}

impl TestRunner {
    /// Create a runner for the corpus under `path`; the flavor comes from the client
    pub fn new(client: Arc<dyn ApiClient>, path: impl Into<PathBuf>) -> Self {
        let flavor = client.flavor();
        Self {
            client,
            path: path.into(),
            flavor,
            tests_to_skip: Vec::new(),
            reporter: Arc::new(NullReporter),
        }
    }

    /// Force a deployment flavor instead of the client's
    pub fn with_flavor(mut self, flavor: Option<Flavor>) -> Self {
        if let Some(flavor) = flavor {
            self.flavor = flavor;
        }
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Exclude test files whose path matches any of `patterns`
    pub fn add_tests_to_skip<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tests_to_skip
            .extend(patterns.into_iter().map(|p| skip_pattern(p.as_ref())));
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    fn is_skipped(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.tests_to_skip.iter().any(|re| re.is_match(&text))
    }

    fn locate(&self, entry: &str) -> PathBuf {
        let candidate = PathBuf::from(entry);
        if candidate.is_absolute() {
            return candidate;
        }
        let under_root = self.path.join(entry);
        if under_root.exists() || !candidate.exists() {
            under_root
        } else {
            candidate
        }
    }

    /// Resolve the selection into test files
    ///
    /// Empty selection: every YAML file below the root. A `.yml`/`.yaml`
    /// entry is one file; anything else is a directory whose YAML files run.
    pub fn select_test_files(&self, selection: &[String]) -> Result<Vec<PathBuf>> {
        if !self.path.is_dir() {
            return Err(Error::Config(format!(
                "Couldn't find test files in '{}'. Run 'conformance fetch' to download them",
                self.path.display()
            )));
        }

        let mut files = if selection.is_empty() {
            yaml_files(&self.path, usize::MAX)
        } else {
            let mut files = Vec::new();
            for entry in selection {
                let located = self.locate(entry);
                if is_yaml(&located) {
                    files.push(located);
                } else {
                    files.extend(yaml_files(&located, 1));
                }
            }
            files
        };

        files.sort();
        files.dedup();
        files.retain(|f| {
            let skipped = self.is_skipped(f);
            if skipped {
                tracing::debug!(file = %f.display(), "skipped by pattern");
            }
            !skipped
        });
        Ok(files)
    }

    /// Run one document, recording failing test cases in `summary`
    ///
    /// Errors returned from here concern the whole document.
    async fn run_document(&self, path: &Path, summary: &mut RunSummary) -> Result<()> {
        let file = test_identifier(path);
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let document = TestDocument::parse(&content)?;

        if !document.requires.matches(self.flavor) {
            tracing::info!(file = %file, requires = %document.requires, flavor = %self.flavor, "skipping document");
            self.reporter.document_skipped(&file, &document.requires);
            summary.skipped_documents += 1;
            return Ok(());
        }

        for case in document.test_cases(&file)? {
            let result = case
                .execute(self.client.as_ref(), self.reporter.as_ref())
                .await;
            summary.tests += case.count();
            if let Err(error) = result {
                tracing::debug!(file = %file, test = %case.title(), error = %error, "test failed");
                summary.failures.push(Failure {
                    file: file.clone(),
                    test: Some(case.title().to_string()),
                    error,
                });
            }
        }
        Ok(())
    }

    /// Run the selected test files and report the totals
    pub async fn run(&self, selection: &[String]) -> Result<RunSummary> {
        let start = Instant::now();
        let files = self.select_test_files(selection)?;
        tracing::info!(files = files.len(), flavor = %self.flavor, "running tests");

        let mut summary = RunSummary::default();
        for path in &files {
            if let Err(error) = self.run_document(path, &mut summary).await {
                let file = test_identifier(path);
                tracing::warn!(file = %file, error = %error, "test document failed");
                summary.failures.push(Failure {
                    file,
                    test: None,
                    error,
                });
            }
        }

        summary.elapsed = start.elapsed();
        tracing::info!(
            tests = summary.tests,
            failures = summary.failures.len(),
            skipped = summary.skipped_documents,
            "run finished"
        );
        self.reporter.summary(&summary);
        Ok(summary)
    }
}
