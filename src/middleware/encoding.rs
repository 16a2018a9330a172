//! Character-encoding normalization stage.
//!
//! Two independent rewrites, both of which may apply to one response:
//!
//! - an advertised `charset` is forced onto the body text;
//! - a JSON object marked `"encoding": "base64"` gets its `content` field
//!   decoded in place and the body re-serialized.

use super::media_type::MediaType;
use super::ResponseStage;
use crate::errors::{GitHubError, GitHubResult};
use crate::transport::{HttpResponse, ResponseBody};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde_json::Value;

/// Encoding marker written after content has been decoded.
pub const DECODED_ENCODING: &str = "utf-8";

/// Normalizes body encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingStage;

impl ResponseStage for EncodingStage {
    fn name(&self) -> &'static str {
        "encoding"
    }

    fn on_complete(&self, mut response: HttpResponse) -> GitHubResult<HttpResponse> {
        let media = MediaType::from_response(&response);

        if let Some(charset) = media.charset.clone() {
            response.charset = Some(charset);
        }

        if media.is_json() {
            response = decode_json_content(response)?;
        }

        Ok(response)
    }
}

fn decode_json_content(mut response: HttpResponse) -> GitHubResult<HttpResponse> {
    let ResponseBody::Bytes(ref bytes) = response.body else {
        return Ok(response);
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(response);
    }

    let mut data: Value = serde_json::from_str(&response.text()).map_err(|e| {
        GitHubError::parser(format!("Failed to parse JSON response: {}", e))
            .with_status(response.status)
            .with_request(response.method.as_str(), &response.url)
            .with_cause(e)
    })?;

    let Some(object) = data.as_object_mut() else {
        return Ok(response);
    };
    let marked = object.get("encoding").and_then(Value::as_str) == Some("base64");
    let Some(encoded) = object.get("content").and_then(Value::as_str) else {
        return Ok(response);
    };
    if !marked {
        return Ok(response);
    }

    // The contents API wraps base64 at 60 columns.
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let raw = STANDARD.decode(compact.as_bytes()).map_err(|e| {
        GitHubError::parser(format!("Failed to decode base64 content: {}", e))
            .with_status(response.status)
            .with_request(response.method.as_str(), &response.url)
            .with_cause(e)
    })?;

    let content = match String::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            let raw = e.into_bytes();
            let lossy = String::from_utf8_lossy(&raw).into_owned();
            response.decoded_content = Some(Bytes::from(raw));
            lossy
        }
    };

    object.insert("content".to_string(), Value::String(content));
    object.insert(
        "encoding".to_string(),
        Value::String(DECODED_ENCODING.to_string()),
    );

    let body = serde_json::to_vec(&data).map_err(|e| {
        GitHubError::parser(format!("Failed to re-serialize response: {}", e)).with_cause(e)
    })?;
    response.body = ResponseBody::Bytes(Bytes::from(body));
    // Re-serialized bytes are UTF-8 whatever the wire charset was.
    response.body_encoding = Some("UTF-8".to_string());

    Ok(response)
}
