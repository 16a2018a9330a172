//! Link-header pagination.

use super::*;
use integrations_octokit::GitHubClientBuilder;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_auto_paginate_concatenates_pages() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    let next = format!("{}/user/repos?page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("per_page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1}, {"id": 2}]))
                .insert_header("link", format!(r#"<{}>; rel="next", <{}>; rel="last""#, next, next).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 3}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).auto_paginate(2).build()?;
    let repos = client.paginate("/user/repos").await?;

    let ids: Vec<u64> = repos.iter().filter_map(|r| r["id"].as_u64()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn test_without_auto_paginate_only_first_page() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1}]))
                .insert_header("link", format!(r#"<{}/user/repos?page=2>; rel="next""#, server.uri()).as_str()),
        )
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server).build()?;
    let response = client.get("/user/repos").await?;
    assert!(response.links.has_next());

    let repos = client.paginate("/user/repos").await?;
    assert_eq!(repos.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_search_results_contribute_items() -> anyhow::Result<()> {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "incomplete_results": false,
            "items": [{"full_name": "a/b"}, {"full_name": "c/d"}]
        })))
        .mount(&server)
        .await;

    let client = GitHubClientBuilder::from_config_builder(config_for(&server).per_page(100))
        .build()?;
    let items = client.paginate("/search/repositories?q=octokit").await?;

    assert_eq!(items.len(), 2);
    assert_eq!(items[1]["full_name"], "c/d");
    Ok(())
}
