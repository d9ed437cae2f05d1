//! Graph transport collaborator
//!
//! The engine only shapes requests and decodes responses. Sending them is
//! the job of a [`GraphTransport`] implementation supplied by the
//! application (an HTTP client, a mock, a replay log).

use async_trait::async_trait;
use serde::Serialize;
use simple_graph_api::Params;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;

use crate::error::TransportError;
use crate::lock;

/// HTTP verb of a graph request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A shaped request: `{target}/{edge}` with a verb and parameters
#[derive(Clone, PartialEq)]
pub struct GraphRequest {
    pub target: String,
    pub edge: Option<String>,
    pub method: HttpMethod,
    pub params: Params,
    /// Filled in by the dispatcher from the open session
    pub access_token: Option<String>,
}

impl GraphRequest {
    pub fn new(method: HttpMethod, target: impl Into<String>, edge: Option<&str>) -> Self {
        Self {
            target: target.into(),
            edge: edge.map(str::to_string),
            method,
            params: Params::new(),
            access_token: None,
        }
    }

    pub fn get(target: impl Into<String>, edge: Option<&str>) -> Self {
        Self::new(HttpMethod::Get, target, edge)
    }

    pub fn post(target: impl Into<String>, edge: Option<&str>) -> Self {
        Self::new(HttpMethod::Post, target, edge)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, target, None)
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Relative graph path, e.g. `me/friends`
    pub fn path(&self) -> String {
        match &self.edge {
            Some(edge) if !edge.is_empty() => format!("{}/{}", self.target, edge),
            _ => self.target.clone(),
        }
    }
}

impl fmt::Debug for GraphRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphRequest")
            .field("method", &self.method)
            .field("path", &self.path())
            .field("params", &self.params.len())
            .field("authorized", &self.access_token.is_some())
            .finish()
    }
}

/// Raw response body
#[derive(Debug, Clone, PartialEq)]
pub struct GraphResponse {
    pub body: serde_json::Value,
}

impl GraphResponse {
    pub fn new(body: serde_json::Value) -> Self {
        Self { body }
    }
}

/// Transport collaborator contract
///
/// Timeouts are the transport's concern; whatever failure it reports is
/// passed through to the caller once.
#[async_trait]
pub trait GraphTransport: Send + Sync {
    async fn call(&self, request: GraphRequest) -> Result<GraphResponse, TransportError>;
}

// ============================================================================
// Recording Transport (for testing)
// ============================================================================

/// Transport that answers from a script and records every request
///
/// Responses are queued per request path (`me/feed`). A path with an
/// empty queue gets the fallback response (`{}` unless changed).
#[derive(Debug)]
pub struct RecordingTransport {
    scripted: Mutex<HashMap<String, VecDeque<Result<GraphResponse, TransportError>>>>,
    fallback: Mutex<Result<GraphResponse, TransportError>>,
    requests: Mutex<Vec<GraphRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(HashMap::new()),
            fallback: Mutex::new(Ok(GraphResponse::new(serde_json::json!({})))),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a JSON body for the next request to `path`
    pub fn respond_json(self, path: &str, body: serde_json::Value) -> Self {
        self.push(path, Ok(GraphResponse::new(body)));
        self
    }

    /// Queue a failure for the next request to `path`
    pub fn respond_error(self, path: &str, error: TransportError) -> Self {
        self.push(path, Err(error));
        self
    }

    /// Response for paths with nothing queued
    pub fn with_fallback(self, fallback: Result<GraphResponse, TransportError>) -> Self {
        *lock(&self.fallback) = fallback;
        self
    }

    fn push(&self, path: &str, response: Result<GraphResponse, TransportError>) {
        lock(&self.scripted)
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<GraphRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn last_request(&self) -> Option<GraphRequest> {
        lock(&self.requests).last().cloned()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphTransport for RecordingTransport {
    async fn call(&self, request: GraphRequest) -> Result<GraphResponse, TransportError> {
        let path = request.path();
        lock(&self.requests).push(request);

        let scripted = lock(&self.scripted)
            .get_mut(&path)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(response) => response,
            None => lock(&self.fallback).clone(),
        }
    }
}
