//! Error taxonomy for the GitHub client.
//!
//! Status codes map onto a closed set of [`GitHubErrorKind`]s through
//! [`classify`]; each kind belongs to exactly one [`ErrorClass`].

use crate::redact::redact_url;
use crate::transport::HttpResponse;
use crate::types::{retry_after, RateLimit, ValidationError};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type alias for GitHub operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Broad family an error kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// 4xx responses.
    Client,
    /// 5xx responses.
    Server,
    /// Response body could not be decoded.
    Parser,
    /// Detected before any request was sent.
    Configuration,
    /// The exchange itself failed (timeout, connect, I/O).
    Network,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client_error"),
            Self::Server => write!(f, "server_error"),
            Self::Parser => write!(f, "parser_error"),
            Self::Configuration => write!(f, "configuration_error"),
            Self::Network => write!(f, "network_error"),
        }
    }
}

/// Error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitHubErrorKind {
    // Client errors
    /// 400.
    BadRequest,
    /// 401.
    Unauthorized,
    /// 401 asking for a one-time password.
    OneTimePasswordRequired,
    /// 403.
    Forbidden,
    /// 403 after too many failed logins.
    TooManyLoginAttempts,
    /// 403 from abuse detection or a secondary rate limit.
    AbuseDetected,
    /// 404.
    NotFound,
    /// 406.
    NotAcceptable,
    /// 409.
    Conflict,
    /// 410.
    Gone,
    /// 415.
    UnsupportedMediaType,
    /// 422.
    UnprocessableEntity,
    /// 429, or 403 with an exhausted rate limit.
    TooManyRequests,
    /// 451.
    UnavailableForLegalReasons,
    /// Any other 4xx.
    ClientError,

    // Server errors
    /// 500.
    InternalServerError,
    /// 501.
    NotImplemented,
    /// 502.
    BadGateway,
    /// 503.
    ServiceUnavailable,
    /// 504.
    GatewayTimeout,
    /// Any other 5xx.
    ServerError,

    // Body decoding
    /// Malformed or unexpected response body.
    ParserError,

    // Configuration
    /// Invalid or conflicting configuration.
    InvalidConfiguration,
    /// Endpoint needs client id and secret.
    ApplicationCredentialsRequired,
    /// Endpoint needs OAuth or bearer token authentication.
    TokenAuthRequired,

    // Network
    /// Request timed out.
    Timeout,
    /// Connection could not be established.
    ConnectionFailed,
    /// Any other transport failure.
    Transport,
}

impl GitHubErrorKind {
    /// Returns the family this kind belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::BadRequest
            | Self::Unauthorized
            | Self::OneTimePasswordRequired
            | Self::Forbidden
            | Self::TooManyLoginAttempts
            | Self::AbuseDetected
            | Self::NotFound
            | Self::NotAcceptable
            | Self::Conflict
            | Self::Gone
            | Self::UnsupportedMediaType
            | Self::UnprocessableEntity
            | Self::TooManyRequests
            | Self::UnavailableForLegalReasons
            | Self::ClientError => ErrorClass::Client,
            Self::InternalServerError
            | Self::NotImplemented
            | Self::BadGateway
            | Self::ServiceUnavailable
            | Self::GatewayTimeout
            | Self::ServerError => ErrorClass::Server,
            Self::ParserError => ErrorClass::Parser,
            Self::InvalidConfiguration
            | Self::ApplicationCredentialsRequired
            | Self::TokenAuthRequired => ErrorClass::Configuration,
            Self::Timeout | Self::ConnectionFailed | Self::Transport => ErrorClass::Network,
        }
    }
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::OneTimePasswordRequired => "one_time_password_required",
            Self::Forbidden => "forbidden",
            Self::TooManyLoginAttempts => "too_many_login_attempts",
            Self::AbuseDetected => "abuse_detected",
            Self::NotFound => "not_found",
            Self::NotAcceptable => "not_acceptable",
            Self::Conflict => "conflict",
            Self::Gone => "gone",
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::UnprocessableEntity => "unprocessable_entity",
            Self::TooManyRequests => "too_many_requests",
            Self::UnavailableForLegalReasons => "unavailable_for_legal_reasons",
            Self::ClientError => "client_error",
            Self::InternalServerError => "internal_server_error",
            Self::NotImplemented => "not_implemented",
            Self::BadGateway => "bad_gateway",
            Self::ServiceUnavailable => "service_unavailable",
            Self::GatewayTimeout => "gateway_timeout",
            Self::ServerError => "server_error",
            Self::ParserError => "parser_error",
            Self::InvalidConfiguration => "invalid_configuration",
            Self::ApplicationCredentialsRequired => "application_credentials_required",
            Self::TokenAuthRequired => "token_auth_required",
            Self::Timeout => "timeout",
            Self::ConnectionFailed => "connection_failed",
            Self::Transport => "transport",
        };
        f.write_str(name)
    }
}

/// Maps a status code onto an error kind. `None` means the response is not
/// an error.
pub fn classify(status: u16) -> Option<GitHubErrorKind> {
    let kind = match status {
        400 => GitHubErrorKind::BadRequest,
        401 => GitHubErrorKind::Unauthorized,
        403 => GitHubErrorKind::Forbidden,
        404 => GitHubErrorKind::NotFound,
        406 => GitHubErrorKind::NotAcceptable,
        409 => GitHubErrorKind::Conflict,
        410 => GitHubErrorKind::Gone,
        415 => GitHubErrorKind::UnsupportedMediaType,
        422 => GitHubErrorKind::UnprocessableEntity,
        429 => GitHubErrorKind::TooManyRequests,
        451 => GitHubErrorKind::UnavailableForLegalReasons,
        500 => GitHubErrorKind::InternalServerError,
        501 => GitHubErrorKind::NotImplemented,
        502 => GitHubErrorKind::BadGateway,
        503 => GitHubErrorKind::ServiceUnavailable,
        504 => GitHubErrorKind::GatewayTimeout,
        400..=499 => GitHubErrorKind::ClientError,
        500..=599 => GitHubErrorKind::ServerError,
        _ => return None,
    };
    Some(kind)
}

/// Narrows 401/403 using the OTP header and the server's message. The
/// result always stays in the client family.
fn refine(kind: GitHubErrorKind, response: &HttpResponse, message: &str) -> GitHubErrorKind {
    match kind {
        GitHubErrorKind::Unauthorized => {
            let otp_required = response
                .header("x-github-otp")
                .map(|v| v.to_ascii_lowercase().starts_with("required"))
                .unwrap_or(false);
            if otp_required {
                GitHubErrorKind::OneTimePasswordRequired
            } else {
                kind
            }
        }
        GitHubErrorKind::Forbidden => {
            let lower = message.to_ascii_lowercase();
            if lower.contains("secondary rate limit") || lower.contains("abuse") {
                GitHubErrorKind::AbuseDetected
            } else if lower.contains("rate limit exceeded") {
                GitHubErrorKind::TooManyRequests
            } else if lower.contains("login attempts exceeded") {
                GitHubErrorKind::TooManyLoginAttempts
            } else {
                kind
            }
        }
        _ => kind,
    }
}

/// GitHub API error.
#[derive(Error, Debug)]
pub struct GitHubError {
    kind: GitHubErrorKind,
    message: String,
    status_code: Option<u16>,
    method: Option<String>,
    url: Option<String>,
    documentation_url: Option<String>,
    errors: Vec<ValidationError>,
    request_id: Option<String>,
    rate_limit: Option<RateLimit>,
    retry_after: Option<u64>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for GitHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(method), Some(url)) = (&self.method, &self.url) {
            write!(f, "{} {}: ", method, url)?;
        }
        if let Some(code) = self.status_code {
            write!(f, "{} - ", code)?;
        }
        f.write_str(&self.message)?;
        if let Some(ref doc) = self.documentation_url {
            write!(f, " // See: {}", doc)?;
        }
        if !self.errors.is_empty() {
            f.write_str("\nError summary:")?;
            for error in &self.errors {
                for (label, value) in [
                    ("resource", &error.resource),
                    ("field", &error.field),
                    ("code", &error.code),
                    ("message", &error.message),
                ] {
                    if let Some(value) = value {
                        write!(f, "\n  {}: {}", label, value)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl GitHubError {
    /// Creates a new error. Secret query values in the message are redacted.
    pub fn new(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: redact_url(&message.into()),
            status_code: None,
            method: None,
            url: None,
            documentation_url: None,
            errors: Vec::new(),
            request_id: None,
            rate_limit: None,
            retry_after: None,
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Records the failed request. The URL is redacted before it is stored.
    pub fn with_request(mut self, method: impl AsRef<str>, url: impl AsRef<str>) -> Self {
        self.method = Some(method.as_ref().to_ascii_uppercase());
        self.url = Some(redact_url(url.as_ref()));
        self
    }

    /// Sets the documentation URL.
    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Sets the GitHub request ID.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Sets the rate limit info.
    pub fn with_rate_limit(mut self, info: RateLimit) -> Self {
        self.retry_after = self.retry_after.or(info.retry_after);
        self.rate_limit = Some(info);
        self
    }

    /// Sets the server-requested wait before retrying, in seconds.
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> GitHubErrorKind {
        self.kind
    }

    /// Gets the error family.
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// Gets the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the request method.
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Gets the redacted request URL.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Gets the documentation URL.
    pub fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref()
    }

    /// Gets the validation errors from a 422 body.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Gets the request ID.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Gets the rate limit info.
    pub fn rate_limit(&self) -> Option<&RateLimit> {
        self.rate_limit.as_ref()
    }

    /// Server-requested wait before retrying, in seconds.
    pub fn retry_after(&self) -> Option<u64> {
        self.retry_after
    }

    /// Builds an error from a completed response, or `None` when the status
    /// does not classify as an error.
    pub fn from_response(response: &HttpResponse) -> Option<Self> {
        let kind = classify(response.status)?;
        let body = response.body_bytes();
        let data: Option<Value> = serde_json::from_slice(body).ok();

        let message = response_message(data.as_ref(), body, response);
        let kind = refine(kind, response, &message);

        let mut error = Self::new(kind, message)
            .with_status(response.status)
            .with_request(response.method.as_str(), &response.url);

        if let Some(ref data) = data {
            if let Some(doc) = data.get("documentation_url").and_then(Value::as_str) {
                error = error.with_documentation_url(doc);
            }
            if let Some(items) = data.get("errors").and_then(Value::as_array) {
                error.errors = items.iter().map(validation_error).collect();
            }
        }
        if let Some(id) = response.header("x-github-request-id") {
            error = error.with_request_id(id);
        }
        if let Some(info) = RateLimit::from_headers(&response.headers) {
            error = error.with_rate_limit(info);
        }
        if let Some(seconds) = retry_after(&response.headers) {
            error = error.with_retry_after(seconds);
        }

        Some(error)
    }

    // Convenience constructors

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidConfiguration, message)
    }

    /// Creates a parser error.
    pub fn parser(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::ParserError, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::Timeout, message)
    }
}

/// Derives the message for an error response.
///
/// Order: `message` field, `error` string, first element of an `error`
/// array, then `"<METHOD> <URL>: <status>"` with `": <body>"` appended when
/// there is a body.
fn response_message(data: Option<&Value>, body: &[u8], response: &HttpResponse) -> String {
    if let Some(data) = data {
        if let Some(message) = data.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
        match data.get("error") {
            Some(Value::String(error)) => return error.clone(),
            Some(Value::Array(items)) if !items.is_empty() => {
                return match &items[0] {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
            }
            _ => {}
        }
    }

    let mut message = format!(
        "{} {}: {}",
        response.method.as_str(),
        redact_url(&response.url),
        response.status
    );
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        message.push_str(": ");
        message.push_str(text);
    }
    message
}

fn validation_error(item: &Value) -> ValidationError {
    match item {
        Value::String(s) => ValidationError {
            message: Some(s.clone()),
            ..Default::default()
        },
        other => serde_json::from_value(other.clone()).unwrap_or_default(),
    }
}
