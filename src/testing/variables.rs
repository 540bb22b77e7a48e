//! Bound variables and parameter substitution
//!
//! Each test case gets one [`VariableStore`]. `set` actions write to it,
//! and every `$name` token in the parameters of a `do` action is replaced
//! from it before the request reaches the client.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::common::{Error, Result};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([0-9a-z_-]+)").expect("valid token regex"));

/// Variables bound by `set` actions, scoped to one test case
#[derive(Debug, Default, Clone)]
pub struct VariableStore {
    values: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` under `name`, replacing any previous binding
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Look up a variable; an unbound name is always an error
    pub fn lookup(&self, name: &str) -> Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| Error::UnboundVariable(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve a `$name` reference, passing any other value through
    pub fn expand(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(s) if s.starts_with('$') && s.len() > 1 => {
                self.lookup(&s[1..]).cloned()
            }
            other => Ok(other.clone()),
        }
    }
}

/// Text substituted for a variable inside a string
fn substitution(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn bind_string(s: &str, vars: &VariableStore) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    // Fail on the first unbound token instead of substituting a blank
    for capture in TOKEN.captures_iter(s) {
        vars.lookup(&capture[1])?;
    }

    Ok(TOKEN
        .replace_all(s, |c: &Captures| {
            vars.lookup(&c[1]).map(substitution).unwrap_or_default()
        })
        .into_owned())
}

/// Rewrite a parameter tree, replacing `$name` tokens inside strings
///
/// Substitution is textual: `"index-$suffix"` with `suffix = 42` becomes
/// `"index-42"`. Map keys and non-string scalars are left alone.
pub fn bind_params(params: &Value, vars: &VariableStore) -> Result<Value> {
    match params {
        Value::String(s) => bind_string(s, vars).map(Value::String),
        Value::Array(items) => items
            .iter()
            .map(|item| bind_params(item, vars))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut bound = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                bound.insert(key.clone(), bind_params(value, vars)?);
            }
            Ok(Value::Object(bound))
        }
        other => Ok(other.clone()),
    }
}
