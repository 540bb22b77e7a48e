//! HTTP client
//!
//! Maps operation names onto REST endpoints through a table of
//! `{ method, paths, boolean }` entries. Path placeholders consume their
//! parameters, `body` becomes the request body and whatever is left goes
//! into the query string.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Method;
use serde_json::{Map, Value};

use super::{ApiClient, ApiResponse, ClientError, ClientResult, ErrorKind, Flavor, Request, Response};
use crate::common::config::{ClientConfig, EndpointConfig};
use crate::common::{Error, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("valid placeholder regex"));

fn endpoint(method: &str, paths: &[&str]) -> EndpointConfig {
    EndpointConfig {
        method: method.to_string(),
        paths: paths.iter().map(|p| p.to_string()).collect(),
        boolean: method == "HEAD",
    }
}

/// Endpoints known without any configuration
pub fn builtin_endpoints() -> HashMap<String, EndpointConfig> {
    [
        ("info", endpoint("GET", &["/"])),
        ("ping", endpoint("HEAD", &["/"])),
        ("index", endpoint("POST", &["/{index}/_doc/{id}", "/{index}/_doc"])),
        ("get", endpoint("GET", &["/{index}/_doc/{id}"])),
        ("exists", endpoint("HEAD", &["/{index}/_doc/{id}"])),
        ("delete", endpoint("DELETE", &["/{index}/_doc/{id}"])),
        ("update", endpoint("POST", &["/{index}/_update/{id}"])),
        ("search", endpoint("POST", &["/{index}/_search", "/_search"])),
        ("count", endpoint("POST", &["/{index}/_count", "/_count"])),
        ("bulk", endpoint("POST", &["/{index}/_bulk", "/_bulk"])),
        ("indices.create", endpoint("PUT", &["/{index}"])),
        ("indices.delete", endpoint("DELETE", &["/{index}"])),
        ("indices.exists", endpoint("HEAD", &["/{index}"])),
        ("indices.refresh", endpoint("POST", &["/{index}/_refresh", "/_refresh"])),
        ("indices.get_mapping", endpoint("GET", &["/{index}/_mapping", "/_mapping"])),
        ("indices.put_mapping", endpoint("PUT", &["/{index}/_mapping"])),
    ]
    .into_iter()
    .map(|(name, endpoint)| (name.to_string(), endpoint))
    .collect()
}

/// Render a parameter for a path segment or query string
fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(param_string).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Pick the first path template whose placeholders are all provided,
/// removing the consumed parameters
fn select_path(templates: &[String], params: &mut Map<String, Value>) -> Option<String> {
    let template = templates.iter().find(|t| {
        PLACEHOLDER
            .captures_iter(t)
            .all(|c| params.contains_key(&c[1]))
    })?;

    let path = PLACEHOLDER
        .replace_all(template, |c: &regex::Captures| {
            params.get(&c[1]).map(param_string).unwrap_or_default()
        })
        .into_owned();
    for capture in PLACEHOLDER.captures_iter(template) {
        params.remove(&capture[1]);
    }
    Some(path)
}

/// Client talking to a REST service over HTTP
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    endpoints: HashMap<String, EndpointConfig>,
    config: ClientConfig,
}

impl HttpClient {
    /// Build a client from configuration; configured endpoints override built-in ones
    pub fn new(config: ClientConfig, endpoints: HashMap<String, EndpointConfig>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("api-conformance")
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut table = builtin_endpoints();
        table.extend(endpoints);

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            endpoints: table,
            config,
        })
    }

    fn transport_error(e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::new(ErrorKind::RequestTimeout, e.to_string())
        } else {
            ClientError::new(ErrorKind::Transport, e.to_string())
        }
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn perform(&self, request: &Request) -> ClientResult<Response> {
        let endpoint = self.endpoints.get(&request.operation).ok_or_else(|| {
            ClientError::argument(format!("no endpoint for operation '{}'", request.operation))
        })?;

        let mut params = match &request.params {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(ClientError::argument(format!(
                    "parameters for '{}' must be a mapping, got {}",
                    request.operation, other
                )))
            }
        };
        let body = params.remove("body");

        let path = select_path(&endpoint.paths, &mut params).ok_or_else(|| {
            ClientError::argument(format!(
                "missing path parameters for '{}' (paths: {})",
                request.operation,
                endpoint.paths.join(", ")
            ))
        })?;

        let method = Method::from_bytes(endpoint.method.as_bytes()).map_err(|_| {
            ClientError::argument(format!("invalid HTTP method '{}'", endpoint.method))
        })?;

        let query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.clone(), param_string(v)))
            .collect();

        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .query(&query);

        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("ApiKey {}", key));
        } else if let Some(user) = &self.config.username {
            builder = builder.basic_auth(user, self.config.password.as_ref());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match body {
            Some(Value::Array(lines)) => {
                let mut ndjson = String::new();
                for line in &lines {
                    match line {
                        Value::String(s) => ndjson.push_str(s),
                        other => ndjson.push_str(&other.to_string()),
                    }
                    ndjson.push('\n');
                }
                builder
                    .header("Content-Type", "application/x-ndjson")
                    .body(ndjson)
            }
            Some(Value::String(raw)) => builder.header("Content-Type", "application/json").body(raw),
            Some(value) => builder.json(&value),
            None => builder,
        };

        tracing::debug!(operation = %request.operation, path = %path, "sending request");
        let response = builder.send().await.map_err(Self::transport_error)?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let text = response.text().await.map_err(Self::transport_error)?;

        if endpoint.boolean {
            return match status {
                200..=299 => Ok(Response::Boolean(true)),
                404 => Ok(Response::Boolean(false)),
                _ => Err(ClientError::from_status(status, &text)),
            };
        }
        if status >= 400 {
            return Err(ClientError::from_status(status, &text));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(Response::Api(ApiResponse {
            status,
            headers,
            body,
        }))
    }

    fn flavor(&self) -> Flavor {
        if self.config.serverless {
            Flavor::Serverless
        } else {
            Flavor::Stack
        }
    }
}
