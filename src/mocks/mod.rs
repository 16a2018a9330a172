//! Mock transport for testing GitHub API clients.
//!
//! [`MockTransport`] plugs into [`GitHubClient`](crate::GitHubClient) in
//! place of the network. Responses are registered per method and path and
//! replayed in order; the last one keeps being served once the queue runs
//! down. Unmatched requests get a 404.

use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::transport::{HttpResponse, HttpTransport, PreparedRequest};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A canned response, or a simulated transport failure.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Bytes,
    /// Headers, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Delay before responding.
    pub delay: Option<Duration>,
    /// Fail the exchange with this kind instead of responding.
    pub failure: Option<GitHubErrorKind>,
}

impl MockResponse {
    /// Creates a response with the given status and raw body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
            delay: None,
            failure: None,
        }
    }

    /// Creates a JSON response.
    pub fn json<T: Serialize>(status: u16, body: &T) -> Self {
        Self::new(status, serde_json::to_vec(body).unwrap_or_default())
            .with_header("content-type", JSON_CONTENT_TYPE)
    }

    /// Creates a 200 OK JSON response.
    pub fn ok<T: Serialize>(body: &T) -> Self {
        Self::json(200, body)
    }

    /// Creates a 204 No Content response.
    pub fn no_content() -> Self {
        Self::new(204, Bytes::new())
    }

    /// Creates an error response with a GitHub-style JSON body.
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(
            status,
            &serde_json::json!({
                "message": message,
                "documentation_url": "https://docs.github.com/rest"
            }),
        )
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::error(404, "Not Found")
    }

    /// Creates a 500 Internal Server Error response.
    pub fn server_error() -> Self {
        Self::error(500, "Internal Server Error")
    }

    /// Creates a 422 Validation Failed response.
    pub fn validation_failed(errors: Vec<(&str, &str, &str)>) -> Self {
        let errors: Vec<_> = errors
            .into_iter()
            .map(|(resource, field, code)| {
                serde_json::json!({
                    "resource": resource,
                    "field": field,
                    "code": code
                })
            })
            .collect();

        Self::json(
            422,
            &serde_json::json!({
                "message": "Validation Failed",
                "errors": errors,
                "documentation_url": "https://docs.github.com/rest"
            }),
        )
    }

    /// Creates a primary rate limit response.
    pub fn rate_limited(retry_after: u64) -> Self {
        let reset_at = Utc::now() + ChronoDuration::minutes(1);
        Self::error(403, "API rate limit exceeded for 127.0.0.1.")
            .with_rate_limit(5000, 0, reset_at.timestamp())
            .with_header("retry-after", &retry_after.to_string())
    }

    /// Creates an Atom feed response.
    pub fn feed(xml: &str) -> Self {
        Self::new(200, xml.to_string())
            .with_header("content-type", "application/atom+xml; charset=utf-8")
    }

    /// Simulates a request that times out.
    pub fn timeout() -> Self {
        Self::transport_failure(GitHubErrorKind::Timeout)
    }

    /// Simulates a failure of the exchange itself.
    pub fn transport_failure(kind: GitHubErrorKind) -> Self {
        let mut response = Self::new(0, Bytes::new());
        response.failure = Some(kind);
        response
    }

    /// Adds a delay to the response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Adds a header to the response.
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds rate limit headers.
    pub fn with_rate_limit(self, limit: u32, remaining: u32, reset_timestamp: i64) -> Self {
        self.with_header("x-ratelimit-limit", &limit.to_string())
            .with_header("x-ratelimit-remaining", &remaining.to_string())
            .with_header("x-ratelimit-reset", &reset_timestamp.to_string())
    }

    fn into_http(self, request: &PreparedRequest) -> GitHubResult<HttpResponse> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                GitHubError::configuration(format!("Invalid mock header name: {}", e)).with_cause(e)
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                GitHubError::configuration(format!("Invalid mock header value: {}", e)).with_cause(e)
            })?;
            headers.append(name, value);
        }
        Ok(HttpResponse::new(
            request.method.clone(),
            request.url.clone(),
            self.status,
            headers,
            self.body,
        ))
    }
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// HTTP method.
    pub method: Method,
    /// Full URL, query included.
    pub url: String,
    /// Request path.
    pub path: String,
    /// Query string.
    pub query: Option<String>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
}

#[derive(Debug, Default)]
struct Route {
    responses: Vec<MockResponse>,
    served: usize,
}

impl Route {
    fn next(&mut self) -> Option<MockResponse> {
        let index = self.served.min(self.responses.len().checked_sub(1)?);
        self.served += 1;
        self.responses.get(index).cloned()
    }
}

/// In-memory [`HttpTransport`].
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    routes: Arc<RwLock<HashMap<String, Route>>>,
    requests: Arc<RwLock<Vec<MockRequest>>>,
}

impl MockTransport {
    /// Creates a transport with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a response for a method and path.
    ///
    /// A path with a query string only matches requests carrying exactly
    /// that query; a bare path matches any query.
    pub fn on(&self, method: Method, path: &str, response: MockResponse) {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        routes
            .entry(route_key(&method, path))
            .or_default()
            .responses
            .push(response);
    }

    /// Registers several responses, served in order.
    pub fn on_sequence(&self, method: Method, path: &str, responses: Vec<MockResponse>) {
        for response in responses {
            self.on(method.clone(), path, response);
        }
    }

    /// Registers a GET response.
    pub fn on_get(&self, path: &str, response: MockResponse) {
        self.on(Method::GET, path, response);
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Counts requests made to a method and path.
    pub fn invocations(&self, method: Method, path: &str) -> usize {
        self.requests
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.method == method && matches_path(r, path))
            .count()
    }

    /// Clears recorded requests and registered routes.
    pub fn reset(&self) {
        self.routes.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.requests.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn record(&self, request: &PreparedRequest) -> GitHubResult<MockRequest> {
        let url = Url::parse(&request.url).map_err(|e| {
            GitHubError::configuration(format!("Invalid request URL: {}", e)).with_cause(e)
        })?;
        let recorded = MockRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            path: url.path().to_string(),
            query: url.query().map(String::from),
            headers: request.headers.clone(),
            body: request.body.clone(),
        };
        self.requests
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(recorded.clone());
        Ok(recorded)
    }

    fn next_response(&self, request: &MockRequest) -> Option<MockResponse> {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        let bare = route_key(&request.method, &request.path);
        let exact = match request.query {
            Some(ref query) => format!("{}?{}", bare, query),
            None => bare.clone(),
        };
        if let Some(route) = routes.get_mut(&exact) {
            return route.next();
        }
        routes.get_mut(&bare).and_then(Route::next)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: PreparedRequest) -> GitHubResult<HttpResponse> {
        let recorded = self.record(&request)?;
        let response = self
            .next_response(&recorded)
            .unwrap_or_else(MockResponse::not_found);

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(kind) = response.failure {
            return Err(GitHubError::new(kind, "Simulated transport failure")
                .with_request(request.method.as_str(), &request.url));
        }

        tracing::trace!(
            method = %request.method,
            path = %recorded.path,
            status = response.status,
            "Mock response"
        );
        response.into_http(&request)
    }
}

fn route_key(method: &Method, path: &str) -> String {
    format!("{} {}", method, path)
}

fn matches_path(request: &MockRequest, path: &str) -> bool {
    match path.split_once('?') {
        Some((p, q)) => request.path == p && request.query.as_deref() == Some(q),
        None => request.path == path,
    }
}
