//! Media type descriptor derived from response headers.

use crate::feed::is_feed_media_type;
use crate::transport::HttpResponse;

/// Vendor header describing the GitHub media type that was served,
/// e.g. `github.v3; param=raw; format=json`.
pub const GITHUB_MEDIA_TYPE_HEADER: &str = "x-github-media-type";

/// View over a response's content type headers.
///
/// Recomputed from headers on every call; nothing is cached between
/// responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaType {
    /// Lower-cased `type/subtype` from `content-type`.
    pub essence: Option<String>,
    /// `charset` parameter from `content-type`, as advertised.
    pub charset: Option<String>,
    /// `format` parameter from the vendor media type header.
    pub format: Option<String>,
    /// `param` parameter from the vendor media type header.
    pub param: Option<String>,
}

impl MediaType {
    /// Builds the descriptor for a response.
    pub fn from_response(response: &HttpResponse) -> Self {
        Self::from_headers(
            response.header("content-type"),
            response.header(GITHUB_MEDIA_TYPE_HEADER),
        )
    }

    /// Builds the descriptor from raw header values.
    pub fn from_headers(content_type: Option<&str>, vendor: Option<&str>) -> Self {
        let mut media = Self::default();

        if let Some(value) = content_type {
            let mut parts = value.split(';');
            let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
            if !essence.is_empty() {
                media.essence = Some(essence);
            }
            media.charset = parameter(parts, "charset");
        }

        if let Some(value) = vendor {
            // The first segment is the version (`github.v3`), not a parameter.
            media.format = parameter(value.split(';').skip(1), "format");
            media.param = parameter(value.split(';').skip(1), "param");
        }

        media
    }

    /// Returns true when the body is JSON.
    ///
    /// Accepts `application/json` and any `+json` suffix. Without a
    /// content type, falls back to the vendor `format` parameter.
    pub fn is_json(&self) -> bool {
        match self.essence.as_deref() {
            Some(essence) => essence == "application/json" || essence.ends_with("+json"),
            None => self.format.as_deref() == Some("json"),
        }
    }

    /// Returns true when the body is an Atom or RSS feed.
    pub fn is_feed(&self) -> bool {
        self.essence.as_deref().map(is_feed_media_type).unwrap_or(false)
    }
}

fn parameter<'a>(parts: impl Iterator<Item = &'a str>, name: &str) -> Option<String> {
    parts.filter_map(|part| part.split_once('=')).find_map(|(key, value)| {
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}
