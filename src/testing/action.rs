//! Test actions
//!
//! Every list entry of a test is a single-key mapping; the key picks the
//! action kind:
//!
//! ```yaml
//! - do:        { catch: missing, indices.get: { index: books } }
//! - set:       { _id: id }
//! - match:     { hits.total.value: 3 }
//! - length:    { hits.hits: 3 }
//! - is_true:   acknowledged
//! - is_false:  errors
//! - gte:       { took: 0 }
//! ```

use std::fmt;

use serde_json::{Map, Value};

use crate::common::{Error, Result};

/// Keys of a `do` mapping that are never the operation name
const DO_OPTIONS: &[&str] = &[
    "catch",
    "headers",
    "warnings",
    "allowed_warnings",
    "node_selector",
];

/// Comparison operator of `lt`/`lte`/`gt`/`gte`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "lt" => Some(CompareOp::Lt),
            "lte" => Some(CompareOp::Lte),
            "gt" => Some(CompareOp::Gt),
            "gte" => Some(CompareOp::Gte),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }

    /// Apply the operator to an ordering of `actual` relative to `expected`
    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Lt => ordering == Less,
            CompareOp::Lte => ordering != Greater,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Gte => ordering != Less,
        }
    }
}

/// A `do` action: call one client operation
#[derive(Debug, Clone, PartialEq)]
pub struct Invoke {
    pub operation: String,
    pub params: Value,
    /// Expected failure category
    pub catch: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// One declarative step of a test
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Invoke(Invoke),
    Bind { path: String, variable: String },
    MatchEquals { path: String, expected: Value },
    MatchLength { path: String, expected: usize },
    AssertTrue { path: String },
    AssertFalse { path: String },
    Compare { op: CompareOp, path: String, expected: Value },
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The single `path: value` entry of an assertion mapping
fn single_entry<'a>(keyword: &str, value: &'a Value) -> Result<(&'a String, &'a Value)> {
    value
        .as_object()
        .and_then(|map| map.iter().next())
        .ok_or_else(|| Error::document(format!("'{}' expects a mapping, got {}", keyword, value)))
}

/// Target of `is_true`/`is_false`; null, `''` and `[]` mean "no path"
fn target_path(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(items) if items.is_empty() => String::new(),
        other => scalar_string(other),
    }
}

fn parse_headers(value: &Value) -> Result<Vec<(String, String)>> {
    let map = value
        .as_object()
        .ok_or_else(|| Error::document(format!("'headers' expects a mapping, got {}", value)))?;
    Ok(map
        .iter()
        .map(|(k, v)| (k.clone(), scalar_string(v)))
        .collect())
}

impl Invoke {
    /// Parse the value of a `do` key
    pub fn parse(value: &Value) -> Result<Self> {
        let map: Map<String, Value> = match value {
            Value::String(operation) => {
                return Ok(Self {
                    operation: operation.clone(),
                    params: Value::Object(Map::new()),
                    catch: None,
                    headers: Vec::new(),
                })
            }
            Value::Object(map) => map.clone(),
            other => {
                return Err(Error::document(format!(
                    "'do' expects a mapping or an operation name, got {}",
                    other
                )))
            }
        };

        let catch = map.get("catch").map(scalar_string);
        let headers = match map.get("headers") {
            Some(value) => parse_headers(value)?,
            None => Vec::new(),
        };

        let mut operations = map
            .iter()
            .filter(|(key, _)| !DO_OPTIONS.contains(&key.as_str()));
        let (operation, params) = operations
            .next()
            .ok_or_else(|| Error::document("'do' names no operation"))?;
        if let Some((extra, _)) = operations.next() {
            return Err(Error::document(format!(
                "'do' names more than one operation: '{}' and '{}'",
                operation, extra
            )));
        }

        let params = match params {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };

        Ok(Self {
            operation: operation.clone(),
            params,
            catch,
            headers,
        })
    }
}

impl Action {
    /// Parse one step; unknown action keys yield `None`
    pub fn parse(step: &Value) -> Result<Option<Self>> {
        let (keyword, value) = step
            .as_object()
            .and_then(|map| map.iter().next())
            .ok_or_else(|| Error::document(format!("test step must be a mapping, got {}", step)))?;

        let action = match keyword.as_str() {
            "do" => Action::Invoke(Invoke::parse(value)?),
            "set" => {
                let (path, variable) = single_entry(keyword, value)?;
                Action::Bind {
                    path: path.clone(),
                    variable: scalar_string(variable),
                }
            }
            "match" => {
                let (path, expected) = single_entry(keyword, value)?;
                Action::MatchEquals {
                    path: path.clone(),
                    expected: expected.clone(),
                }
            }
            "length" => {
                let (path, expected) = single_entry(keyword, value)?;
                let expected = expected.as_u64().ok_or_else(|| {
                    Error::document(format!("'length' of '{}' must be a count, got {}", path, expected))
                })?;
                Action::MatchLength {
                    path: path.clone(),
                    expected: expected as usize,
                }
            }
            "is_true" => Action::AssertTrue {
                path: target_path(value),
            },
            "is_false" => Action::AssertFalse {
                path: target_path(value),
            },
            other => match CompareOp::from_keyword(other) {
                Some(op) => {
                    let (path, expected) = single_entry(keyword, value)?;
                    Action::Compare {
                        op,
                        path: path.clone(),
                        expected: expected.clone(),
                    }
                }
                None => {
                    tracing::warn!(action = %other, "skipping unknown action");
                    return Ok(None);
                }
            },
        };
        Ok(Some(action))
    }

    /// Parse a list of steps, skipping unknown actions
    pub fn parse_list(steps: &Value) -> Result<Vec<Self>> {
        match steps {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => {
                let mut actions = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(action) = Self::parse(item)? {
                        actions.push(action);
                    }
                }
                Ok(actions)
            }
            other => Err(Error::document(format!("expected a list of steps, got {}", other))),
        }
    }

    /// The action's keyword as written in the document
    pub fn keyword(&self) -> &'static str {
        match self {
            Action::Invoke(_) => "do",
            Action::Bind { .. } => "set",
            Action::MatchEquals { .. } => "match",
            Action::MatchLength { .. } => "length",
            Action::AssertTrue { .. } => "is_true",
            Action::AssertFalse { .. } => "is_false",
            Action::Compare { op, .. } => op.keyword(),
        }
    }

    pub fn is_invoke(&self) -> bool {
        matches!(self, Action::Invoke(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Invoke(invoke) => {
                write!(f, "do {}", invoke.operation)?;
                if let Some(catch) = &invoke.catch {
                    write!(f, " (catch {})", catch)?;
                }
                Ok(())
            }
            Action::Bind { path, variable } => write!(f, "set {} => ${}", path, variable),
            Action::MatchEquals { path, expected } => write!(f, "match {}: {}", path, expected),
            Action::MatchLength { path, expected } => write!(f, "length {}: {}", path, expected),
            Action::AssertTrue { path } => write!(f, "is_true {}", path),
            Action::AssertFalse { path } => write!(f, "is_false {}", path),
            Action::Compare { op, path, expected } => {
                write!(f, "{} {} {}", path, op.symbol(), expected)
            }
        }
    }
}
