//! In-process operation registry
//!
//! An [`ApiClient`] assembled from named handlers. Dotted names register
//! into nested namespaces, so `indices.create` lives in the `indices`
//! namespace under `create`, and dispatch walks the same way.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ApiClient, ClientError, ClientResult, Flavor, Request, Response};

/// A registered operation
pub type Handler = Arc<dyn Fn(&Request) -> ClientResult<Response> + Send + Sync>;

#[derive(Default)]
struct Namespace {
    handlers: HashMap<String, Handler>,
    children: HashMap<String, Namespace>,
}

impl Namespace {
    fn insert(&mut self, path: &[&str], handler: Handler) {
        match path {
            [] => {}
            [name] => {
                self.handlers.insert(name.to_string(), handler);
            }
            [namespace, rest @ ..] => self
                .children
                .entry(namespace.to_string())
                .or_default()
                .insert(rest, handler),
        }
    }

    fn find(&self, path: &[&str]) -> Option<&Handler> {
        match path {
            [] => None,
            [name] => self.handlers.get(*name),
            [namespace, rest @ ..] => self.children.get(*namespace)?.find(rest),
        }
    }
}

/// Client backed by registered handlers
///
/// Every dispatched request is recorded, in order, whether or not a
/// handler was found.
pub struct OperationRegistry {
    flavor: Flavor,
    root: Namespace,
    calls: Mutex<Vec<Request>>,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self {
            flavor: Flavor::Stack,
            root: Namespace::default(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Report a different deployment flavor
    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Register a handler under a (possibly dotted) operation name
    pub fn register<F>(mut self, operation: &str, handler: F) -> Self
    where
        F: Fn(&Request) -> ClientResult<Response> + Send + Sync + 'static,
    {
        let path: Vec<&str> = operation.split('.').collect();
        self.root.insert(&path, Arc::new(handler));
        self
    }

    /// Requests dispatched so far
    pub fn calls(&self) -> Vec<Request> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Operation names dispatched so far
    pub fn operations(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.operation).collect()
    }
}

#[async_trait]
impl ApiClient for OperationRegistry {
    async fn perform(&self, request: &Request) -> ClientResult<Response> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }

        let path: Vec<&str> = request.operation.split('.').collect();
        let handler = self.root.find(&path).ok_or_else(|| {
            ClientError::argument(format!("unknown operation '{}'", request.operation))
        })?;
        handler(request)
    }

    fn flavor(&self) -> Flavor {
        self.flavor
    }
}
