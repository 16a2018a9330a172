//! HTTP transport layer.
//!
//! The transport only moves bytes. Classification, body rewriting and retry
//! all happen above it, in the dispatcher.

mod http_transport;

pub use http_transport::ReqwestTransport;

use crate::errors::GitHubResult;
use crate::feed::Feed;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::borrow::Cow;

/// A fully built request, ready to be sent.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL, including any query string.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
}

impl PreparedRequest {
    /// Creates a request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Response body as it moves through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Bytes, possibly already rewritten by a stage.
    Bytes(Bytes),
    /// Parsed feed document.
    Feed(Feed),
}

/// A completed HTTP exchange.
///
/// Owned by one in-flight request. Pipeline stages take it by value and hand
/// it to the next stage, replacing `body` or `body_encoding` on the way.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers (case-insensitive).
    pub headers: HeaderMap,
    /// Response body.
    pub body: ResponseBody,
    /// Request method.
    pub method: Method,
    /// Request URL.
    pub url: String,
    /// Character set advertised by the server.
    pub charset: Option<String>,
    /// Encoding of `body` once a stage has re-serialized it. Takes
    /// precedence over `charset` when decoding text.
    pub body_encoding: Option<String>,
    /// Raw bytes of base64 content that was not valid UTF-8.
    pub decoded_content: Option<Bytes>,
}

impl HttpResponse {
    /// Creates a response with a byte body.
    pub fn new(
        method: Method,
        url: impl Into<String>,
        status: u16,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            status,
            headers,
            body: ResponseBody::Bytes(body),
            method,
            url: url.into(),
            charset: None,
            body_encoding: None,
            decoded_content: None,
        }
    }

    /// Gets a header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Gets the body bytes; empty when the body is a parsed feed.
    pub fn body_bytes(&self) -> &[u8] {
        match &self.body {
            ResponseBody::Bytes(bytes) => bytes,
            ResponseBody::Feed(_) => &[],
        }
    }

    /// Encoding the body bytes are currently in.
    pub fn body_charset(&self) -> Option<&str> {
        self.body_encoding.as_deref().or(self.charset.as_deref())
    }

    /// Decodes the body text in [`body_charset`](Self::body_charset), UTF-8
    /// by default.
    pub fn text(&self) -> Cow<'_, str> {
        decode_text(self.body_bytes(), self.body_charset())
    }
}

/// Decodes bytes in the named character set.
///
/// UTF-8 and the single-byte Latin-1 family are decoded exactly; any other
/// label falls back to lossy UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], charset: Option<&str>) -> Cow<'a, str> {
    let label = charset.map(|c| c.trim().trim_matches('"').to_ascii_lowercase());
    match label.as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1" | "iso_8859-1" | "l1") => {
            Cow::Owned(bytes.iter().map(|&b| b as char).collect())
        }
        _ => String::from_utf8_lossy(bytes),
    }
}

/// Trait for HTTP transport implementations.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and returns the raw response.
    ///
    /// Error statuses are returned as responses, not errors. Only failures
    /// of the exchange itself produce `Err`.
    async fn send(&self, request: PreparedRequest) -> GitHubResult<HttpResponse>;
}
