//! Credential resolution as seen by the server.

use super::*;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use integrations_octokit::{GitHubClientBuilder, GitHubErrorKind, TokenPlacement};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
}

async fn mount_user(server: &wiremock::MockServer, authorization: &str) {
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", authorization))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octocat"})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_personal_token_beats_access_token() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    mount_user(&server, &basic("octocat/token", "ghp_personal")).await;

    let client = client_for(&server)
        .personal_token("octocat", "ghp_personal")
        .access_token("gho_oauth")
        .build()?;

    assert!(client.basic_authenticated());
    assert!(!client.token_authenticated());
    client.get("/user").await?;
    Ok(())
}

#[tokio::test]
async fn test_password_basic_auth() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    mount_user(&server, &basic("octocat", "hunter2")).await;

    let client = client_for(&server).basic_auth("octocat", "hunter2").build()?;
    client.get("/user").await?;
    Ok(())
}

#[tokio::test]
async fn test_oauth_token_header() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    mount_user(&server, "token gho_oauth").await;

    let client = client_for(&server).access_token("gho_oauth").build()?;
    assert!(client.ensure_token_auth().is_ok());
    client.get("/user").await?;
    Ok(())
}

#[tokio::test]
async fn test_bearer_token_header() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    mount_user(&server, "Bearer eyJhbGciOiJSUzI1NiJ9.e30.sig").await;

    let client = client_for(&server)
        .bearer_token("eyJhbGciOiJSUzI1NiJ9.e30.sig")
        .build()?;
    assert!(client.bearer_authenticated());
    client.get("/user").await?;
    Ok(())
}

#[tokio::test]
async fn test_application_credentials() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    mount_user(&server, &basic("Iv1.abc", "app-secret")).await;

    let client = client_for(&server)
        .client_credentials("Iv1.abc", "app-secret")
        .build()?;
    assert!(client.application_authenticated());
    assert!(!client.user_authenticated());
    client.get("/user").await?;
    Ok(())
}

#[tokio::test]
async fn test_query_token_is_redacted_in_errors() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(query_param("access_token", "gho_query_secret"))
        .respond_with(error_response(401, "Bad credentials"))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClientBuilder::from_config_builder(
        config_for(&server)
            .access_token("gho_query_secret")
            .oauth_token_placement(TokenPlacement::Query),
    )
    .build()?;

    let err = client.get("/user").await.unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::Unauthorized);
    assert!(err.url().unwrap_or_default().ends_with("/user?access_token=(redacted)"));
    assert!(!err.to_string().contains("gho_query_secret"));
    assert!(!format!("{:?}", err).contains("gho_query_secret"));
    Ok(())
}

#[tokio::test]
async fn test_missing_credentials_fail_at_http_layer() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(error_response(401, "Requires authentication"))
        .mount(&server)
        .await;

    let client = client_for(&server).build()?;
    assert!(!client.authenticated());

    let err = client.get("/user").await.unwrap_err();
    assert_eq!(err.kind(), GitHubErrorKind::Unauthorized);
    Ok(())
}
