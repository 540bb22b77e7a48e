//! Path expressions into responses
//!
//! A path without dots is either a response attribute (`$status`) or a
//! top-level body key. Dotted paths are split on unescaped dots and walked
//! segment by segment:
//!
//! ```text
//! "jobs.0.node.attributes.ml\.enabled" => Key(jobs) Index(0) Key(node) Key(attributes) Key(ml.enabled)
//! "$id.name"                           => Var(id) Key(name)
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::variables::VariableStore;
use crate::client::Response;
use crate::common::Result;

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$([a-z]+)$").expect("valid attribute regex"));

static INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[0-9]+$").expect("valid index regex"));

/// One step of a dotted path
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal map key, escapes removed
    Key(String),
    /// Position in a sequence (negative counts from the end)
    Index(i64),
    /// Restart the walk from a bound variable
    Var(String),
}

/// Split a dotted path on dots not preceded by a backslash
fn split_unescaped(expr: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev = None;
    for (i, c) in expr.char_indices() {
        if c == '.' && prev != Some('\\') {
            parts.push(&expr[start..i]);
            start = i + 1;
        }
        prev = Some(c);
    }
    parts.push(&expr[start..]);
    parts
}

/// Parse a dotted path into segments
///
/// Empty segments are dropped, as is a leading `$body`.
pub fn parse_path(expr: &str) -> Vec<Segment> {
    let mut parts: Vec<&str> = split_unescaped(expr)
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    if parts.first() == Some(&"$body") {
        parts.remove(0);
    }

    parts
        .into_iter()
        .map(|part| {
            if INDEX.is_match(part) {
                if let Ok(index) = part.parse::<i64>() {
                    return Segment::Index(index);
                }
            }
            match part.strip_prefix('$') {
                Some(name) if !name.is_empty() => Segment::Var(name.to_string()),
                _ => Segment::Key(part.replace('\\', "")),
            }
        })
        .collect()
}

fn step<'a>(document: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (segment, document) {
        (Segment::Key(key), Value::Object(map)) => map.get(key),
        (Segment::Index(index), Value::Array(items)) => {
            let position = if *index < 0 {
                items.len().checked_sub(index.unsigned_abs() as usize)?
            } else {
                *index as usize
            };
            items.get(position)
        }
        // Numeric segments may also name map keys
        (Segment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
        _ => None,
    }
}

/// Walk `segments` starting from `root`
///
/// Returns `Ok(None)` as soon as a step misses; the only error is a
/// reference to an unbound variable.
fn walk<'a>(
    root: Option<&'a Value>,
    segments: &[Segment],
    vars: &'a VariableStore,
) -> Result<Option<&'a Value>> {
    let mut current = root;
    for segment in segments {
        current = match segment {
            Segment::Var(name) => Some(vars.lookup(name)?),
            other => match current.and_then(|doc| step(doc, other)) {
                Some(next) => Some(next),
                None => return Ok(None),
            },
        };
    }
    Ok(current)
}

/// Resolve a path expression against the last response
///
/// `None` means not found. Never mutates the response or the variables.
pub fn resolve(
    expr: &str,
    response: Option<&Response>,
    vars: &VariableStore,
) -> Result<Option<Value>> {
    let body = response.and_then(Response::body);

    if !expr.contains('.') {
        if let Some(captures) = ATTRIBUTE.captures(expr) {
            return Ok(response.and_then(|r| r.attribute(&captures[1])));
        }
        return Ok(body
            .and_then(|b| step(b, &Segment::Key(expr.to_string())))
            .cloned());
    }

    let segments = parse_path(expr);
    Ok(walk(body, &segments, vars)?.cloned())
}
