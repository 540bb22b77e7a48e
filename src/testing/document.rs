//! Test documents
//!
//! A test file is a YAML stream of mappings. `requires`, `setup` and
//! `teardown` are shared by the file; every other key is the title of a
//! test and holds its list of actions:
//!
//! ```yaml
//! requires:
//!   serverless: true
//!   stack: true
//! ---
//! setup:
//!   - do: { indices.create: { index: books } }
//! ---
//! teardown:
//!   - do: { indices.delete: { index: books } }
//! ---
//! "Create a document":
//!   - do: { index: { index: books, id: 1, body: { title: Dune } } }
//!   - match: { result: created }
//! ```

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use super::action::Action;
use super::case::TestCase;
use crate::client::Flavor;
use crate::common::{Error, Result};

/// Deployment flavors a document applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requirement {
    pub stack: bool,
    pub serverless: bool,
}

impl Requirement {
    /// Parse the value of a `requires` key
    pub fn parse(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            Error::document(format!("'requires' expects a mapping, got {}", value))
        })?;
        let flag = |name: &str| map.get(name).and_then(Value::as_bool).unwrap_or(false);
        Ok(Self {
            stack: flag("stack"),
            serverless: flag("serverless"),
        })
    }

    /// Whether a service of `flavor` should run this document
    pub fn matches(&self, flavor: Flavor) -> bool {
        match flavor {
            Flavor::Serverless => self.serverless,
            Flavor::Stack => self.stack,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.stack, self.serverless) {
            (true, true) => write!(f, "stack, serverless"),
            (true, false) => write!(f, "stack"),
            (false, true) => write!(f, "serverless"),
            (false, false) => write!(f, "nothing"),
        }
    }
}

/// A test file split into its fragments
///
/// Steps stay raw YAML values until [`TestDocument::test_cases`] builds
/// actions from them, so a document skipped for its requirement is never
/// checked for malformed steps.
#[derive(Debug, Clone)]
pub struct TestDocument {
    pub requires: Requirement,
    setup: Vec<Value>,
    teardown: Vec<Value>,
    /// Title and raw steps of each test, in file order
    tests: Vec<(String, Value)>,
}

fn parse_fragments(fragments: &[Value]) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    for steps in fragments {
        actions.extend(Action::parse_list(steps)?);
    }
    Ok(actions)
}

impl TestDocument {
    /// Parse a YAML stream
    pub fn parse(content: &str) -> Result<Self> {
        let mut requires = None;
        let mut setup = Vec::new();
        let mut teardown = Vec::new();
        let mut tests = Vec::new();

        for fragment in serde_yaml::Deserializer::from_str(content) {
            let map = match Value::deserialize(fragment)? {
                Value::Null => continue,
                Value::Object(map) => map,
                other => {
                    return Err(Error::document(format!(
                        "top-level fragment must be a mapping, got {}",
                        other
                    )))
                }
            };

            for (key, value) in map {
                match key.as_str() {
                    "requires" => requires = Some(Requirement::parse(&value)?),
                    "setup" => setup.push(value),
                    "teardown" => teardown.push(value),
                    _ => tests.push((key, value)),
                }
            }
        }

        Ok(Self {
            requires: requires.ok_or(Error::MissingRequires)?,
            setup,
            teardown,
            tests,
        })
    }

    /// Titles of the tests, in file order
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.tests.iter().map(|(title, _)| title.as_str())
    }

    /// Build one test case per titled test, sharing setup and teardown
    ///
    /// Fails on the first malformed step anywhere in the document.
    pub fn test_cases(&self, source: &str) -> Result<Vec<TestCase>> {
        let setup = parse_fragments(&self.setup)?;
        let teardown = parse_fragments(&self.teardown)?;
        self.tests
            .iter()
            .map(|(title, steps)| {
                Ok(TestCase::new(
                    title.clone(),
                    source,
                    setup.clone(),
                    Action::parse_list(steps)?,
                    teardown.clone(),
                ))
            })
            .collect()
    }
}
