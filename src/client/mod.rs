//! Service client boundary
//!
//! The interpreter only ever talks to an [`ApiClient`]: it hands over an
//! operation name plus a parameter tree and gets back a [`Response`] or a
//! classified [`ClientError`]. Everything about the wire lives behind it.

mod http;
mod registry;

pub use http::HttpClient;
pub use registry::{Handler, OperationRegistry};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Kind of failure raised by a client call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request timed out
    RequestTimeout,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 500
    InternalServerError,
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// Invalid arguments, rejected before anything was sent
    Argument,
    /// Connection-level failure
    Transport,
    /// Any other HTTP error status
    Other(u16),
}

impl ErrorKind {
    /// Map an HTTP error status to a kind
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::RequestTimeout,
            409 => ErrorKind::Conflict,
            500 => ErrorKind::InternalServerError,
            other => ErrorKind::Other(other),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::RequestTimeout => write!(f, "request timeout"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::InternalServerError => write!(f, "internal server error"),
            ErrorKind::BadRequest => write!(f, "bad request"),
            ErrorKind::Unauthorized => write!(f, "unauthorized"),
            ErrorKind::Forbidden => write!(f, "forbidden"),
            ErrorKind::Argument => write!(f, "invalid argument"),
            ErrorKind::Transport => write!(f, "transport error"),
            ErrorKind::Other(status) => write!(f, "status {}", status),
        }
    }
}

/// Error raised by a client call
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// An invalid-argument error
    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Argument, message)
    }

    /// An error for an HTTP status, formatted as `[status] body`
    pub fn from_status(status: u16, body: &str) -> Self {
        Self::new(ErrorKind::from_status(status), format!("[{}] {}", status, body))
    }
}

/// Deployment flavor a test corpus targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    #[default]
    Stack,
    Serverless,
}

impl FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stack" => Ok(Flavor::Stack),
            "serverless" => Ok(Flavor::Serverless),
            other => Err(format!("unknown flavor '{}'", other)),
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flavor::Stack => write!(f, "stack"),
            Flavor::Serverless => write!(f, "serverless"),
        }
    }
}

/// One call to the service
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Operation name, possibly namespaced (`indices.create`)
    pub operation: String,
    /// Parameters after variable substitution
    pub params: Value,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(operation: impl Into<String>, params: Value) -> Self {
        Self {
            operation: operation.into(),
            params,
            headers: Vec::new(),
        }
    }

    /// Look up a top-level parameter
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

/// A structured service response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// What a client call returns
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Status, headers and body
    Api(ApiResponse),
    /// Predicate-style calls (`exists`, `ping`) answer with a boolean
    Boolean(bool),
}

impl Response {
    /// Shorthand for a structured response
    pub fn ok(status: u16, body: Value) -> Self {
        Response::Api(ApiResponse::new(status, body))
    }

    /// The body, for structured responses
    pub fn body(&self) -> Option<&Value> {
        match self {
            Response::Api(api) => Some(&api.body),
            Response::Boolean(_) => None,
        }
    }

    /// Attribute access on the response itself (`$status`, `$body`, `$headers`)
    pub fn attribute(&self, name: &str) -> Option<Value> {
        let Response::Api(api) = self else {
            return None;
        };
        match name {
            "status" => Some(Value::from(api.status)),
            "body" => Some(api.body.clone()),
            "headers" => Some(Value::Object(
                api.headers
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<Map<String, Value>>(),
            )),
            _ => None,
        }
    }

    /// The literal boolean, for predicate-style responses
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Response::Boolean(b) => Some(*b),
            Response::Api(_) => None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Api(api) => write!(f, "[{}] {}", api.status, api.body),
            Response::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Common interface for service clients
///
/// Operation names are resolved at call time; a namespaced name such as
/// `indices.create` selects the `indices` sub-API first.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Perform one operation
    async fn perform(&self, request: &Request) -> ClientResult<Response>;

    /// Deployment flavor of the service this client talks to
    fn flavor(&self) -> Flavor {
        Flavor::Stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::from_status(404), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_status(408), ErrorKind::RequestTimeout);
        assert_eq!(ErrorKind::from_status(503), ErrorKind::Other(503));
    }

    #[test]
    fn test_status_error_message_carries_code() {
        let err = ClientError::from_status(400, "{\"error\":\"bad\"}");
        assert_eq!(err.kind, ErrorKind::BadRequest);
        assert!(err.message.starts_with("[400]"));
    }

    #[test]
    fn test_response_attributes() {
        let response = Response::Api(
            ApiResponse::new(201, json!({"result": "created"})).with_header("x-id", "7"),
        );
        assert_eq!(response.attribute("status"), Some(json!(201)));
        assert_eq!(response.attribute("body"), Some(json!({"result": "created"})));
        assert_eq!(response.attribute("headers"), Some(json!({"x-id": "7"})));
        assert_eq!(response.attribute("nope"), None);
        assert_eq!(Response::Boolean(true).attribute("status"), None);
    }

    #[test]
    fn test_flavor_parse() {
        assert_eq!("serverless".parse::<Flavor>(), Ok(Flavor::Serverless));
        assert_eq!("Stack".parse::<Flavor>(), Ok(Flavor::Stack));
        assert!("cloud".parse::<Flavor>().is_err());
    }
}
