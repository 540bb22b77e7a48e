//! Action interpreter
//!
//! Executes one [`Action`] at a time against a client, keeping the last
//! response and the variables of the running test case.

use std::cmp::Ordering;

use regex::RegexBuilder;
use serde_json::Value;

use super::action::{Action, CompareOp, Invoke};
use super::catch::is_expected_failure;
use super::path;
use super::variables::{bind_params, VariableStore};
use crate::client::{ApiClient, Request, Response};
use crate::common::{Error, Result};

/// Equality that ignores integer/float representation
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| loose_eq(x, y)))
        }
        _ => a == b,
    }
}

/// Membership: element of a sequence, key of a map, substring of a string
fn contains(container: &Value, member: &Value) -> bool {
    match (container, member) {
        (Value::Array(items), member) => items.iter().any(|item| loose_eq(item, member)),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        (Value::String(text), Value::String(part)) => text.contains(part.as_str()),
        _ => false,
    }
}

/// Text a regex literal is matched against
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Match `actual` against an expected `/regex/` literal
///
/// Multi-line literals are written in extended mode and may carry
/// whitespace and comments.
fn regex_matches(expected: &Value, actual: &Value) -> bool {
    let Value::String(literal) = expected else {
        return false;
    };
    let trimmed = literal.trim();
    let Some(pattern) = trimmed
        .strip_prefix('/')
        .and_then(|s| s.strip_suffix('/'))
    else {
        return false;
    };

    RegexBuilder::new(pattern.trim())
        .ignore_whitespace(pattern.contains('\n'))
        .build()
        .map(|re| re.is_match(&string_form(actual)))
        .unwrap_or(false)
}

/// Number of elements, for `length`
fn element_count(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

/// Null, false and their lookalikes fail `is_true`
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

fn ordering(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Runs actions for one test case
pub struct Interpreter<'a> {
    client: &'a dyn ApiClient,
    vars: VariableStore,
    last_response: Option<Response>,
}

impl<'a> Interpreter<'a> {
    /// Start with no response and no variables
    pub fn new(client: &'a dyn ApiClient) -> Self {
        Self {
            client,
            vars: VariableStore::new(),
            last_response: None,
        }
    }

    pub fn variables(&self) -> &VariableStore {
        &self.vars
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    /// Resolve a path against the last response
    pub fn resolve(&self, expr: &str) -> Result<Option<Value>> {
        path::resolve(expr, self.last_response.as_ref(), &self.vars)
    }

    fn response_text(&self) -> String {
        self.last_response
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "<no response>".to_string())
    }

    fn fail(&self, action: &Action) -> Error {
        Error::assertion_failed(&action.to_string(), &self.response_text())
    }

    /// Execute one action
    pub async fn run(&mut self, action: &Action) -> Result<()> {
        tracing::debug!(action = %action, "running action");
        match action {
            Action::Invoke(invoke) => self.invoke(invoke).await,
            Action::Bind { path, variable } => self.bind(path, variable),
            Action::MatchEquals { path, expected } => self.match_equals(path, expected),
            Action::MatchLength { path, expected } => {
                let actual = self.resolve(path)?;
                match actual.as_ref().and_then(element_count) {
                    Some(count) if count == *expected => Ok(()),
                    _ => Err(self.fail(action)),
                }
            }
            Action::AssertTrue { path } => {
                if self.assert_true(path)? {
                    Ok(())
                } else {
                    Err(self.fail(action))
                }
            }
            Action::AssertFalse { path } => {
                if self.assert_false(path)? {
                    Ok(())
                } else {
                    Err(self.fail(action))
                }
            }
            Action::Compare { op, path, expected } => {
                if self.compare(*op, path, expected)? {
                    Ok(())
                } else {
                    Err(self.fail(action))
                }
            }
        }
    }

    async fn invoke(&mut self, invoke: &Invoke) -> Result<()> {
        let request = Request {
            operation: invoke.operation.clone(),
            params: bind_params(&invoke.params, &self.vars)?,
            headers: invoke.headers.clone(),
        };

        match self.client.perform(&request).await {
            Ok(response) => {
                if let Some(catch) = &invoke.catch {
                    tracing::warn!(
                        operation = %invoke.operation,
                        catch = %catch,
                        "operation succeeded although a failure was expected"
                    );
                }
                tracing::debug!(operation = %invoke.operation, response = %response, "response");
                self.last_response = Some(response);
                Ok(())
            }
            Err(error) => match &invoke.catch {
                Some(catch) if is_expected_failure(catch, &error) => {
                    tracing::debug!(
                        operation = %invoke.operation,
                        catch = %catch,
                        error = %error,
                        "caught expected failure"
                    );
                    Ok(())
                }
                _ => Err(Error::Client(error)),
            },
        }
    }

    fn bind(&mut self, path: &str, variable: &str) -> Result<()> {
        let value = self.resolve(path)?.unwrap_or(Value::Null);
        tracing::debug!(variable = %variable, value = %value, "bound variable");
        self.vars.bind(variable, value);
        Ok(())
    }

    fn match_equals(&self, path: &str, expected: &Value) -> Result<()> {
        let expected = self.vars.expand(expected)?;
        let actual = self.resolve(path)?;

        let matched = actual.as_ref().is_some_and(|actual| {
            loose_eq(actual, &expected)
                || contains(actual, &expected)
                || regex_matches(&expected, actual)
        });
        if matched {
            return Ok(());
        }

        Err(Error::MatchFailed {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: actual.map(|a| a.to_string()),
            response: self.response_text(),
        })
    }

    fn assert_true(&self, path: &str) -> Result<bool> {
        if let Some(response) = &self.last_response {
            if let Some(b) = response.as_bool() {
                return Ok(b);
            }
            if path.is_empty() {
                return Ok(true);
            }
        }
        Ok(self.resolve(path)?.is_some_and(|v| is_truthy(&v)))
    }

    fn assert_false(&self, path: &str) -> Result<bool> {
        if self.last_response.as_ref().and_then(Response::as_bool) == Some(false) {
            return Ok(true);
        }
        Ok(match self.resolve(path)? {
            None | Some(Value::Null) | Some(Value::Bool(false)) => true,
            Some(Value::String(s)) => s == "false",
            Some(_) => false,
        })
    }

    fn compare(&self, op: CompareOp, path: &str, expected: &Value) -> Result<bool> {
        let Some(actual) = self.resolve(path)? else {
            return Ok(false);
        };
        Ok(ordering(&actual, expected).is_some_and(|o| op.holds(o)))
    }
}
