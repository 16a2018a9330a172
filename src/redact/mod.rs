//! Secret redaction for URLs, messages and headers.
//!
//! Every URL that ends up in an error or a log line passes through
//! [`redact_url`] first.

/// Query parameters whose values are secrets.
pub const SECRET_PARAMS: &[&str] = &["client_secret", "access_token", "api_key"];

/// Replacement written in place of a secret value.
pub const REDACTION_MARKER: &str = "(redacted)";

/// Headers whose values never appear in logs.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "x-github-otp",
    "cookie",
    "set-cookie",
];

/// Replaces the value of every secret query parameter in `text`.
///
/// A parameter only matches when it starts the text or follows `?`, `&` or
/// `;`, so `myapi_key=1` is left alone. The value runs until the next `&`,
/// `#`, `:`, `,`, `)`, `>`, quote or whitespace. Everything else is copied
/// byte for byte.
pub fn redact_url(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    'scan: while !rest.is_empty() {
        for param in SECRET_PARAMS {
            if let Some(value_len) = secret_value_len(rest, param) {
                out.push_str(param);
                out.push('=');
                out.push_str(REDACTION_MARKER);
                rest = &rest[param.len() + 1 + value_len..];
                continue 'scan;
            }
        }

        // Copy up to and including the next boundary character.
        let next = rest
            .char_indices()
            .find(|(_, c)| matches!(c, '?' | '&' | ';'))
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(rest.len());
        out.push_str(&rest[..next]);
        rest = &rest[next..];
    }

    out
}

/// Length of a non-empty secret value for `param` at the start of `text`.
fn secret_value_len(text: &str, param: &str) -> Option<usize> {
    let after = text.strip_prefix(param)?.strip_prefix('=')?;
    if after.starts_with(REDACTION_MARKER) {
        return Some(REDACTION_MARKER.len());
    }
    let len = after
        .find(|c: char| {
            matches!(c, '&' | '#' | ':' | ',' | ')' | '>' | '"' | '\'') || c.is_whitespace()
        })
        .unwrap_or(after.len());
    (len > 0).then_some(len)
}

/// Redacts sensitive header values for logging.
pub fn redact_header(name: &str, value: &str) -> String {
    if SENSITIVE_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}
