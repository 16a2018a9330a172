//! HTTP transport implementation using reqwest.

use super::{HttpResponse, HttpTransport, PreparedRequest};
use crate::config::GitHubConfig;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::redact::redact_url;
use async_trait::async_trait;
use reqwest::Client;

/// Reqwest-based HTTP transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport from the client configuration.
    pub fn new(config: &GitHubConfig) -> GitHubResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| {
                GitHubError::configuration(format!("Failed to create HTTP client: {}", e))
                    .with_cause(e)
            })?;

        Ok(Self { client })
    }

    /// Wraps an existing reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn map_send_error(request: &PreparedRequest, e: reqwest::Error) -> GitHubError {
        let kind = if e.is_timeout() {
            GitHubErrorKind::Timeout
        } else if e.is_connect() {
            GitHubErrorKind::ConnectionFailed
        } else {
            GitHubErrorKind::Transport
        };
        // reqwest errors embed the URL; strip it so secrets cannot leak.
        let e = e.without_url();
        GitHubError::new(kind, format!("Request failed: {}", e))
            .with_request(request.method.as_str(), redact_url(&request.url))
            .with_cause(e)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> GitHubResult<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());

        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_send_error(&request, e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_send_error(&request, e))?;

        Ok(HttpResponse::new(request.method, url, status, headers, body))
    }
}
