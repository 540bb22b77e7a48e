//! A single test case
//!
//! Runs setup, body and teardown in order. Teardown always runs, even
//! after a failed setup or body, and the first error is what the caller
//! sees.

use std::fmt;

use super::action::Action;
use super::interpreter::Interpreter;
use super::report::Reporter;
use crate::client::ApiClient;
use crate::common::Result;

/// Execution phase of a test case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Body,
    Teardown,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Body => write!(f, "body"),
            Phase::Teardown => write!(f, "teardown"),
            Phase::Done => write!(f, "done"),
        }
    }
}

/// One titled test from a document
#[derive(Debug, Clone)]
pub struct TestCase {
    title: String,
    source: String,
    setup: Vec<Action>,
    body: Vec<Action>,
    teardown: Vec<Action>,
}

impl TestCase {
    pub fn new(
        title: impl Into<String>,
        source: impl Into<String>,
        setup: Vec<Action>,
        body: Vec<Action>,
        teardown: Vec<Action>,
    ) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            setup,
            body,
            teardown,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Identifier of the file this case came from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of `do` actions in the body
    pub fn count(&self) -> usize {
        self.body.iter().filter(|a| a.is_invoke()).count()
    }

    async fn run_phase(
        &self,
        phase: Phase,
        actions: &[Action],
        interpreter: &mut Interpreter<'_>,
        reporter: &dyn Reporter,
    ) -> Result<()> {
        tracing::debug!(test = %self.source, title = %self.title, %phase, actions = actions.len(), "phase");
        for action in actions {
            if let Err(error) = interpreter.run(action).await {
                reporter.action_failed(self, action, &error);
                return Err(error.in_action(&self.source, &format!("{} {}", phase, action)));
            }
            if phase == Phase::Body {
                reporter.action_passed(self, action, interpreter.last_response());
            }
        }
        Ok(())
    }

    /// Run setup, body and teardown with a fresh set of variables
    pub async fn execute(&self, client: &dyn ApiClient, reporter: &dyn Reporter) -> Result<()> {
        let mut interpreter = Interpreter::new(client);
        reporter.case_started(self);

        let mut result = self
            .run_phase(Phase::Setup, &self.setup, &mut interpreter, reporter)
            .await;
        if result.is_ok() {
            result = self
                .run_phase(Phase::Body, &self.body, &mut interpreter, reporter)
                .await;
        }

        let teardown = self
            .run_phase(Phase::Teardown, &self.teardown, &mut interpreter, reporter)
            .await;

        tracing::debug!(test = %self.source, title = %self.title, phase = %Phase::Done, failed = result.is_err() || teardown.is_err(), "finished");

        match (result, teardown) {
            (Err(error), Err(teardown_error)) => {
                tracing::warn!(test = %self.source, error = %teardown_error, "teardown failed after an earlier error");
                Err(error)
            }
            (Err(error), Ok(())) => Err(error),
            (Ok(()), teardown) => teardown,
        }
    }
}
