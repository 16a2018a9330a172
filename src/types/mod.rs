//! Typed schemas for documents the core knows about.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Rate limit state reported by the `x-ratelimit-*` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimit {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Requests remaining in the window.
    pub remaining: u32,
    /// Requests used in the window.
    pub used: Option<u32>,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
    /// `Retry-After` in seconds, if the server sent one.
    pub retry_after: Option<u64>,
    /// Resource bucket (`core`, `search`, ...).
    pub resource: Option<String>,
}

impl RateLimit {
    /// Reads rate limit headers. Returns `None` unless limit, remaining and
    /// reset are all present and well-formed.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limit = header_parse(headers, "x-ratelimit-limit")?;
        let remaining = header_parse(headers, "x-ratelimit-remaining")?;
        let reset: i64 = header_parse(headers, "x-ratelimit-reset")?;
        let reset_at = DateTime::from_timestamp(reset, 0)?;

        Some(Self {
            limit,
            remaining,
            used: header_parse(headers, "x-ratelimit-used"),
            reset_at,
            retry_after: retry_after(headers),
            resource: headers
                .get("x-ratelimit-resource")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        })
    }

    /// Returns true when the window is used up.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Parses a `Retry-After` header given in seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<u64> {
    header_parse(headers, "retry-after")
}

fn header_parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// A file from the repository contents API.
///
/// After the response pipeline runs, `content` holds the decoded text and
/// `encoding` reads `utf-8`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentFile {
    /// Entry type (`file`, `dir`, `symlink`, `submodule`).
    #[serde(rename = "type")]
    pub content_type: String,
    /// File name.
    pub name: String,
    /// Path within the repository.
    pub path: String,
    /// Blob SHA.
    pub sha: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Content encoding marker.
    #[serde(default)]
    pub encoding: Option<String>,
    /// File content.
    #[serde(default)]
    pub content: Option<String>,
    /// API URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Web URL.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Raw download URL.
    #[serde(default)]
    pub download_url: Option<String>,
}

/// A single validation failure from a 422 body's `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Resource that failed validation.
    #[serde(default)]
    pub resource: Option<String>,
    /// Offending field.
    #[serde(default)]
    pub field: Option<String>,
    /// Machine-readable code.
    #[serde(default)]
    pub code: Option<String>,
    /// Free-form message.
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_rate_limit_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-used", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        headers.insert("x-ratelimit-resource", HeaderValue::from_static("core"));

        let info = RateLimit::from_headers(&headers).unwrap();
        assert_eq!(info.limit, 5000);
        assert!(info.is_exhausted());
        assert_eq!(info.used, Some(5000));
        assert_eq!(info.reset_at.timestamp(), 1_700_000_000);
        assert_eq!(info.resource.as_deref(), Some("core"));
        assert_eq!(info.retry_after, None);
    }

    #[test]
    fn test_rate_limit_missing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("60"));
        assert!(RateLimit::from_headers(&headers).is_none());
    }

    #[test]
    fn test_content_file_deserializes() {
        let file: ContentFile = serde_json::from_value(serde_json::json!({
            "type": "file",
            "name": "LICENSE",
            "path": "LICENSE",
            "sha": "abc",
            "size": 3,
            "encoding": "utf-8",
            "content": "MIT"
        }))
        .unwrap();
        assert_eq!(file.content.as_deref(), Some("MIT"));
        assert_eq!(file.download_url, None);
    }
}
