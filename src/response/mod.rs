//! Processed responses handed back to callers.

use crate::errors::{GitHubError, GitHubResult};
use crate::feed::Feed;
use crate::middleware::MediaType;
use crate::pagination::PaginationLinks;
use crate::transport::{decode_text, HttpResponse, ResponseBody};
use crate::types::RateLimit;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Decoded body of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// JSON body.
    Json(Resource),
    /// Atom or RSS feed.
    Feed(Feed),
    /// Any other non-empty body.
    Text(String),
    /// No body.
    Empty,
}

impl Document {
    /// Gets the JSON resource, if any.
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::Json(resource) => Some(resource),
            _ => None,
        }
    }

    /// Gets the feed, if any.
    pub fn as_feed(&self) -> Option<&Feed> {
        match self {
            Self::Feed(feed) => Some(feed),
            _ => None,
        }
    }
}

/// A JSON resource with loosely typed field access.
///
/// Use [`Resource::deserialize`] for a typed view, or the accessors when
/// only a few fields matter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resource(Value);

impl Resource {
    /// Wraps a JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Gets a field of an object resource.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Gets a string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Gets an unsigned integer field.
    pub fn u64_field(&self, name: &str) -> Option<u64> {
        self.field(name).and_then(Value::as_u64)
    }

    /// Gets a boolean field.
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(Value::as_bool)
    }

    /// Field names of an object resource, in document order.
    pub fn fields(&self) -> Vec<&str> {
        self.0
            .as_object()
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Gets the underlying map of an object resource.
    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    /// Gets the raw JSON value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Consumes the resource, returning the raw JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Deserializes into a typed schema.
    pub fn deserialize<T: DeserializeOwned>(&self) -> GitHubResult<T> {
        T::deserialize(&self.0).map_err(|e| {
            GitHubError::parser(format!("Failed to deserialize resource: {}", e)).with_cause(e)
        })
    }
}

impl From<Value> for Resource {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A response that made it through the pipeline.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Request method.
    pub method: Method,
    /// Final request URL.
    pub url: String,
    /// Body bytes after processing.
    pub body: Bytes,
    /// Character set advertised by the server.
    pub charset: Option<String>,
    /// Encoding of `body` when a stage re-serialized it.
    pub body_encoding: Option<String>,
    /// Raw bytes of decoded base64 content that was not UTF-8.
    pub decoded_content: Option<Bytes>,
    /// Pagination links.
    pub links: PaginationLinks,
    /// Rate limit state reported by the server.
    pub rate_limit: Option<RateLimit>,
    /// Decoded body.
    pub document: Document,
}

impl Response {
    /// Builds the caller-facing response from a processed exchange.
    pub fn from_http(response: HttpResponse) -> GitHubResult<Self> {
        let links = PaginationLinks::from_headers(&response.headers);
        let rate_limit = RateLimit::from_headers(&response.headers);
        let media = MediaType::from_response(&response);

        let (body, document) = match response.body {
            ResponseBody::Feed(feed) => (Bytes::new(), Document::Feed(feed)),
            ResponseBody::Bytes(ref bytes) => {
                let document = decode_document(bytes, response.body_charset(), &media)
                    .map_err(|e| {
                        e.with_status(response.status)
                            .with_request(response.method.as_str(), &response.url)
                    })?;
                (bytes.clone(), document)
            }
        };

        Ok(Self {
            status: response.status,
            headers: response.headers,
            method: response.method,
            url: response.url,
            body,
            charset: response.charset,
            body_encoding: response.body_encoding,
            decoded_content: response.decoded_content,
            links,
            rate_limit,
            document,
        })
    }

    /// Gets a header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body text, decoded in the encoding the body bytes are in.
    pub fn text(&self) -> Cow<'_, str> {
        let charset = self.body_encoding.as_deref().or(self.charset.as_deref());
        decode_text(&self.body, charset)
    }

    /// Gets the JSON resource, if the body was JSON.
    pub fn resource(&self) -> Option<&Resource> {
        self.document.as_resource()
    }

    /// Deserializes a JSON body into a typed schema.
    pub fn json<T: DeserializeOwned>(&self) -> GitHubResult<T> {
        match &self.document {
            Document::Json(resource) => resource.deserialize(),
            _ => Err(GitHubError::parser("Response body is not JSON")
                .with_status(self.status)
                .with_request(self.method.as_str(), &self.url)),
        }
    }
}

fn decode_document(bytes: &[u8], charset: Option<&str>, media: &MediaType) -> GitHubResult<Document> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::Empty);
    }
    let text = decode_text(bytes, charset);
    if !media.is_json() {
        return Ok(Document::Text(text.into_owned()));
    }
    let value: Value = serde_json::from_str(&text).map_err(|e| {
        GitHubError::parser(format!("Failed to parse JSON response: {}", e)).with_cause(e)
    })?;
    Ok(Document::Json(Resource(value)))
}
