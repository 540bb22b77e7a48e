//! Error types for the conformance runner
//!
//! Everything that can stop an action, a test case or a whole document is
//! one variant of [`Error`]. Errors raised by the service client are kept
//! apart in [`ClientError`] because they are the only ones a test may
//! declare as expected.

use std::io;
use thiserror::Error;

use crate::client::ClientError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the conformance runner
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Document Errors ===
    #[error("Malformed test document: {0}")]
    Document(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Test document has no 'requires' section")]
    MissingRequires,

    // === Interpreter Errors ===
    #[error("No such variable: ${0}")]
    UnboundVariable(String),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Match failed for '{path}'\n  Expected: {expected}\n  Actual  : {}\n  Response: {response}", .actual.as_deref().unwrap_or("<missing>"))]
    MatchFailed {
        path: String,
        expected: String,
        actual: Option<String>,
        response: String,
    },

    #[error("Assertion failed: {action}\n  Response: {response}")]
    AssertionFailed { action: String, response: String },

    #[error("{test}: action {action} failed: {source}")]
    Action {
        test: String,
        action: String,
        #[source]
        source: Box<Error>,
    },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a document error
    pub fn document(message: impl Into<String>) -> Self {
        Self::Document(message.into())
    }

    /// Create an assertion failure for a described action
    pub fn assertion_failed(action: &str, response: &str) -> Self {
        Self::AssertionFailed {
            action: action.to_string(),
            response: response.to_string(),
        }
    }

    /// Attach test and action context to an error
    pub fn in_action(self, test: &str, action: &str) -> Self {
        Self::Action {
            test: test.to_string(),
            action: action.to_string(),
            source: Box::new(self),
        }
    }

    /// The failing action, if this error carries one
    pub fn action(&self) -> Option<&str> {
        match self {
            Error::Action { action, .. } => Some(action),
            _ => None,
        }
    }

    /// The innermost error, without action context
    pub fn root(&self) -> &Error {
        match self {
            Error::Action { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this is an assertion failure rather than an error
    pub fn is_failure(&self) -> bool {
        matches!(
            self.root(),
            Error::MatchFailed { .. } | Error::AssertionFailed { .. }
        )
    }
}
