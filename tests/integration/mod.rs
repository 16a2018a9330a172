//! Integration tests using WireMock
//!
//! These tests drive the full request/response cycle through the reqwest
//! transport: request building, authentication, the response pipeline and
//! retry.

pub mod auth;
pub mod middleware;
pub mod pagination;
pub mod retry;

use integrations_octokit::{GitHubClient, GitHubClientBuilder, GitHubConfigBuilder, RetryPolicy};
use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::{MockServer, ResponseTemplate};

/// Installs a test log subscriber once per process. Set `RUST_LOG` to see output.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Starts a mock server.
pub async fn setup_mock_server() -> MockServer {
    init_tracing();
    MockServer::start().await
}

/// Configuration builder pointing at the mock server.
pub fn config_for(server: &MockServer) -> GitHubConfigBuilder {
    GitHubConfigBuilder::new().api_endpoint(server.uri())
}

/// Client builder pointing at the mock server, retrying server errors quickly.
pub fn client_for(server: &MockServer) -> GitHubClientBuilder {
    GitHubClient::builder()
        .api_endpoint(server.uri())
        .retry_policy(RetryPolicy::server_errors(3, Duration::from_millis(5)))
}

/// GitHub-style error body.
pub fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "message": message,
        "documentation_url": "https://docs.github.com/rest"
    }))
}

/// Raw body with an explicit content type.
pub fn raw_response(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_bytes(body.into())
        .insert_header("content-type", content_type)
}
