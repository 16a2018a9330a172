//! Response pipeline behaviour over the wire.

use super::*;
use integrations_octokit::{ContentFile, Document, GitHubClientBuilder, GitHubErrorKind};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>tag:github.com,2008:/octocat</id>
  <title>octocat's Activity</title>
  <updated>2024-01-02T03:04:05Z</updated>
  <link type="text/html" rel="alternate" href="https://github.com/octocat"/>
  <entry>
    <id>tag:github.com,2008:PushEvent/1</id>
    <title type="html">octocat pushed to main in octocat/Hello-World</title>
    <updated>2024-01-02T03:04:05Z</updated>
    <link type="text/html" rel="alternate" href="https://github.com/octocat/Hello-World/compare/a...b"/>
    <author><name>octocat</name></author>
  </entry>
</feed>"#;

#[tokio::test]
async fn test_base64_content_is_decoded() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/octokit/octokit.rb/contents/LICENSE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "file",
            "name": "LICENSE",
            "path": "LICENSE",
            "sha": "0a1b2c",
            "size": 3,
            "encoding": "base64",
            "content": "TUlU\n"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).build()?;
    let response = client.get("/repos/octokit/octokit.rb/contents/LICENSE").await?;

    let resource = response.resource().expect("json body");
    assert_eq!(resource.str_field("content"), Some("MIT"));
    assert_eq!(resource.str_field("encoding"), Some("utf-8"));
    assert!(!response.text().contains("TUlU"));

    let file: ContentFile = response.json()?;
    assert_eq!(file.content.as_deref(), Some("MIT"));
    assert_eq!(file.size, 3);
    Ok(())
}

#[tokio::test]
async fn test_advertised_charset_is_forced() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/users/jose"))
        .respond_with(raw_response(
            200,
            "application/json; charset=ISO-8859-1",
            b"{\"name\":\"Jos\xE9\"}".to_vec(),
        ))
        .mount(&server)
        .await;

    let client = client_for(&server).build()?;
    let response = client.get("/users/jose").await?;

    assert_eq!(response.charset.as_deref(), Some("ISO-8859-1"));
    assert_eq!(response.resource().and_then(|r| r.str_field("name")), Some("José"));
    Ok(())
}

#[tokio::test]
async fn test_base64_content_keeps_latin1_charset() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/jose/r/contents/LICENSE"))
        .respond_with(raw_response(
            200,
            "application/json; charset=ISO-8859-1",
            b"{\"author\":\"Jos\xE9\",\"encoding\":\"base64\",\"content\":\"TUlU\"}".to_vec(),
        ))
        .mount(&server)
        .await;

    let client = client_for(&server).build()?;
    let response = client.get("/repos/jose/r/contents/LICENSE").await?;

    assert_eq!(response.charset.as_deref(), Some("ISO-8859-1"));
    let resource = response.resource().expect("json body");
    assert_eq!(resource.str_field("content"), Some("MIT"));
    assert_eq!(resource.str_field("author"), Some("José"));
    assert!(response.text().contains("José"));
    Ok(())
}

#[tokio::test]
async fn test_atom_feed_is_parsed() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/octocat.atom"))
        .respond_with(raw_response(200, "application/atom+xml; charset=utf-8", ATOM))
        .mount(&server)
        .await;

    let client = client_for(&server).build()?;
    let feed = client.feed(&format!("{}/octocat.atom", server.uri())).await?;

    assert_eq!(feed.title.as_deref(), Some("octocat's Activity"));
    assert_eq!(feed.entries.len(), 1);
    assert_eq!(feed.entries[0].author.as_deref(), Some("octocat"));
    Ok(())
}

#[tokio::test]
async fn test_feed_stage_can_be_disabled() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/octocat.atom"))
        .respond_with(raw_response(200, "application/atom+xml", ATOM))
        .mount(&server)
        .await;

    let client = GitHubClientBuilder::from_config_builder(config_for(&server).parse_feeds(false))
        .build()?;

    let response = client.get("/octocat.atom").await?;
    assert!(matches!(response.document, Document::Text(_)));

    // `feed` still parses the text itself.
    let feed = client.feed("/octocat.atom").await?;
    assert_eq!(feed.entries.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_error_status_short_circuits_decoding() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/missing"))
        .respond_with(error_response(404, "Not Found"))
        .mount(&server)
        .await;

    let client = client_for(&server).build().unwrap();
    let err = client.get("/repos/o/missing").await.unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::NotFound);
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.method(), Some("GET"));
    assert_eq!(err.message(), "Not Found");
    assert_eq!(err.documentation_url(), Some("https://docs.github.com/rest"));
    assert!(err.to_string().contains("/repos/o/missing: 404 - Not Found"));
}

#[tokio::test]
async fn test_validation_failure_summary() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/repos/o/r/issues"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Validation Failed",
            "errors": [{"resource": "Issue", "field": "title", "code": "missing_field"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).build().unwrap();
    let err = client
        .post("/repos/o/r/issues", &json!({"body": "no title"}))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::UnprocessableEntity);
    assert_eq!(err.errors()[0].field.as_deref(), Some("title"));
    assert!(err.to_string().contains("field: title"));
}

#[tokio::test]
async fn test_unmapped_statuses_use_generic_kinds() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/teapot"))
        .respond_with(ResponseTemplate::new(418))
        .mount(&server)
        .await;

    let client = client_for(&server).no_retry().build().unwrap();
    let err = client.get("/teapot").await.unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::ClientError);
    assert!(err.message().ends_with("/teapot: 418"));
}

#[tokio::test]
async fn test_malformed_json_is_parser_error_and_not_retried() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(raw_response(200, "application/json", "{\"name\": "))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).build().unwrap();
    let err = client.get("/broken").await.unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::ParserError);
    assert_eq!(err.status_code(), Some(200));
}

#[tokio::test]
async fn test_malformed_feed_error_names_the_request() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/octocat.atom"))
        .respond_with(raw_response(200, "application/atom+xml", "<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).build().unwrap();
    let err = client.feed("/octocat.atom").await.unwrap_err();

    assert_eq!(err.kind(), GitHubErrorKind::ParserError);
    assert_eq!(err.status_code(), Some(200));
    assert_eq!(err.method(), Some("GET"));
    assert!(err.url().unwrap_or_default().ends_with("/octocat.atom"));
}
