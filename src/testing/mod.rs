//! YAML test runner
//!
//! Reads declarative test documents and replays their actions against an
//! [`ApiClient`](crate::client::ApiClient), checking every response
//! against the expectations written next to it.

mod action;
mod case;
mod catch;
mod document;
mod interpreter;
mod path;
mod report;
mod runner;
mod variables;

pub use action::{Action, CompareOp, Invoke};
pub use case::{Phase, TestCase};
pub use catch::is_expected_failure;
pub use document::{Requirement, TestDocument};
pub use interpreter::Interpreter;
pub use path::{parse_path, resolve, Segment};
pub use report::{ConsoleReporter, NullReporter, Reporter};
pub use runner::{Failure, RunSummary, TestRunner};
pub use variables::{bind_params, VariableStore};
