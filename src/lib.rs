//! API conformance runner
//!
//! Replays declarative YAML test suites against a REST service client and
//! checks every response against the expectations in the documents.

pub mod cli;
pub mod client;
pub mod commands;
pub mod common;
pub mod fetch;
pub mod testing;

// Re-export commonly used types for tests
pub use client::{ApiClient, Flavor, OperationRegistry};
pub use common::{Error, Result};
pub use testing::{RunSummary, TestRunner};
