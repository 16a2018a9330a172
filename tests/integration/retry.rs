//! Retry behaviour over the wire.

use super::*;
use integrations_octokit::config::{BackoffConfig, RetryConfig};
use integrations_octokit::{ErrorClass, GitHubClientBuilder, GitHubErrorKind};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        backoff: BackoffConfig::Fixed(Duration::from_millis(5)),
        ..RetryConfig::default()
    }
}

#[tokio::test]
async fn test_succeeds_on_third_attempt() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(error_response(500, "Server Error"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"full_name": "o/r"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClientBuilder::from_config_builder(config_for(&server).retry(fast_retry(3)))
        .build()?;
    let response = client.get("/repos/o/r").await?;

    assert_eq!(response.resource().and_then(|r| r.str_field("full_name")), Some("o/r"));
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(3));
    assert_eq!(client.metrics().snapshot().requests_retried, 2);
    Ok(())
}

#[tokio::test]
async fn test_exhausted_attempts_return_last_error() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(error_response(503, "Service Unavailable"))
        .expect(2)
        .mount(&server)
        .await;

    let client = GitHubClientBuilder::from_config_builder(config_for(&server).retry(fast_retry(2)))
        .build()
        .unwrap();
    let err = client.get("/repos/o/r").await.unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::ServiceUnavailable);
    assert_eq!(err.class(), ErrorClass::Server);
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(2));
    assert_eq!(client.metrics().snapshot().requests_failed, 1);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r"))
        .respond_with(error_response(403, "Resource not accessible by integration"))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClientBuilder::from_config_builder(config_for(&server).retry(fast_retry(5)))
        .build()
        .unwrap();
    let err = client.get("/repos/o/r").await.unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::Forbidden);
}

#[tokio::test]
async fn test_budget_stops_long_waits() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(error_response(502, "Bad Gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let retry = RetryConfig {
        max_attempts: 5,
        backoff: BackoffConfig::Fixed(Duration::from_secs(30)),
        ..RetryConfig::default()
    };
    let client = GitHubClientBuilder::from_config_builder(
        config_for(&server)
            .retry(retry)
            .request_budget(Duration::from_secs(1)),
    )
    .build()
    .unwrap();

    let started = Instant::now();
    let err = client.get("/slow").await.unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::BadGateway);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_retry_after_header_sets_wait() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(error_response(503, "Busy").insert_header("retry-after", "60"))
        .expect(1)
        .mount(&server)
        .await;

    // Retry-After exceeds the budget, so no second attempt is made.
    let client = GitHubClientBuilder::from_config_builder(
        config_for(&server)
            .retry(fast_retry(3))
            .request_budget(Duration::from_secs(2)),
    )
    .build()
    .unwrap();

    let err = client.get("/busy").await.unwrap_err();
    assert_eq!(err.retry_after(), Some(60));
}

#[tokio::test]
async fn test_connection_failures_are_retried() {
    init_tracing();
    let client = GitHubClientBuilder::from_config_builder(
        integrations_octokit::GitHubConfigBuilder::new()
            .api_endpoint("http://127.0.0.1:1")
            .retry(fast_retry(3)),
    )
    .build()
    .unwrap();

    let err = client.get("/user").await.unwrap_err();

    assert_eq!(err.class(), ErrorClass::Network);
    assert_eq!(client.metrics().snapshot().requests_retried, 2);
}
