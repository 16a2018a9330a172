//! GitHub API client implementation.
//!
//! [`GitHubClient`] builds requests, signs them with the resolved
//! [`AuthStrategy`], and runs transport plus response pipeline under the
//! retry executor. Every call returns an owned [`Response`]; the client
//! keeps no per-request state.

use crate::auth::AuthStrategy;
use crate::config::{GitHubConfig, GitHubConfigBuilder};
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::feed::{parse_feed, Feed};
use crate::middleware::ResponsePipeline;
use crate::observability::{Metrics, RequestTimer, TracingHooks};
use crate::pagination::{page_items, with_per_page};
use crate::resilience::{RetryExecutor, RetryPolicy};
use crate::response::{Document, Response};
use crate::transport::{HttpTransport, PreparedRequest, ReqwestTransport};
use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// `Accept` value sent by [`GitHubClient::feed`].
pub const FEED_MEDIA_TYPE: &str = "application/atom+xml";

/// GitHub API client.
pub struct GitHubClient {
    config: GitHubConfig,
    auth: AuthStrategy,
    transport: Arc<dyn HttpTransport>,
    pipeline: ResponsePipeline,
    retry: RetryExecutor,
    metrics: Arc<Metrics>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_endpoint", &self.config.api_endpoint)
            .field("auth", &self.auth.name())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl GitHubClient {
    /// Creates a client over the reqwest transport.
    pub fn new(config: GitHubConfig) -> GitHubResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client over a custom transport.
    pub fn with_transport(
        config: GitHubConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> GitHubResult<Self> {
        config.validate()?;

        let auth = AuthStrategy::resolve(&config.credentials, config.oauth_token_placement);
        let pipeline = ResponsePipeline::standard(config.parse_feeds);
        let retry = RetryExecutor::new(config.retry.policy()).with_budget(config.request_budget);

        tracing::debug!(
            api_endpoint = %config.api_endpoint,
            auth = auth.name(),
            stages = ?pipeline.stage_names(),
            "GitHub client created"
        );

        Ok(Self {
            config,
            auth,
            transport,
            pipeline,
            retry,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Creates a new client builder.
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Gets the resolved authentication strategy.
    pub fn auth(&self) -> &AuthStrategy {
        &self.auth
    }

    /// Gets the request metrics.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    // Capability predicates

    /// True unless requests go out anonymously.
    pub fn authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// True for login-based basic auth.
    pub fn basic_authenticated(&self) -> bool {
        self.auth.is_basic()
    }

    /// True for OAuth token auth.
    pub fn token_authenticated(&self) -> bool {
        self.auth.is_token()
    }

    /// True for bearer auth.
    pub fn bearer_authenticated(&self) -> bool {
        self.auth.is_bearer()
    }

    /// True when requests are signed with the application's id and secret.
    pub fn application_authenticated(&self) -> bool {
        self.auth.is_application()
    }

    /// True when requests act as a user.
    pub fn user_authenticated(&self) -> bool {
        self.auth.is_user()
    }

    // Preconditions

    /// Fails unless a client id and secret are configured.
    ///
    /// Looks at the credentials, not the resolved strategy: an app's
    /// credentials may be present alongside a higher-priority user token.
    pub fn ensure_application_credentials(&self) -> GitHubResult<()> {
        let credentials = &self.config.credentials;
        let id = credentials.client_id.as_deref().filter(|s| !s.is_empty());
        let secret = credentials
            .client_secret
            .as_ref()
            .filter(|s| !s.expose_secret().is_empty());
        if id.is_some() && secret.is_some() {
            Ok(())
        } else {
            Err(GitHubError::new(
                GitHubErrorKind::ApplicationCredentialsRequired,
                "Client ID and secret required for application authentication",
            ))
        }
    }

    /// Fails unless requests are signed with an OAuth or bearer token.
    pub fn ensure_token_auth(&self) -> GitHubResult<()> {
        if self.auth.is_token() || self.auth.is_bearer() {
            Ok(())
        } else {
            Err(GitHubError::new(
                GitHubErrorKind::TokenAuthRequired,
                "OAuth or bearer token authentication required",
            ))
        }
    }

    // HTTP methods

    /// Makes a GET request.
    pub async fn get(&self, path: &str) -> GitHubResult<Response> {
        self.request(Method::GET, path, None).await
    }

    /// Makes a GET request with query parameters.
    pub async fn get_with_params<P: Serialize>(&self, path: &str, params: &P) -> GitHubResult<Response> {
        let query = serde_urlencoded::to_string(params).map_err(|e| {
            GitHubError::configuration(format!("Failed to serialize parameters: {}", e))
                .with_cause(e)
        })?;
        let url = self.build_url(path);
        let url = match (query.is_empty(), url.contains('?')) {
            (true, _) => url,
            (false, false) => format!("{}?{}", url, query),
            (false, true) => format!("{}&{}", url, query),
        };
        self.request(Method::GET, &url, None).await
    }

    /// Makes a GET request and deserializes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GitHubResult<T> {
        self.get(path).await?.json()
    }

    /// Makes a HEAD request.
    pub async fn head(&self, path: &str) -> GitHubResult<Response> {
        self.request(Method::HEAD, path, None).await
    }

    /// Makes a POST request with a JSON body.
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> GitHubResult<Response> {
        self.request(Method::POST, path, Some(encode_body(body)?)).await
    }

    /// Makes a PUT request with a JSON body.
    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> GitHubResult<Response> {
        self.request(Method::PUT, path, Some(encode_body(body)?)).await
    }

    /// Makes a PATCH request with a JSON body.
    pub async fn patch<B: Serialize>(&self, path: &str, body: &B) -> GitHubResult<Response> {
        self.request(Method::PATCH, path, Some(encode_body(body)?)).await
    }

    /// Makes a DELETE request.
    pub async fn delete(&self, path: &str) -> GitHubResult<Response> {
        self.request(Method::DELETE, path, None).await
    }

    /// Makes a request with an already-encoded JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> GitHubResult<Response> {
        let request = self.prepare(method, path, body, None)?;
        self.execute(request).await
    }

    /// Fetches every item of a list endpoint.
    ///
    /// Applies `per_page` when configured. With `auto_paginate` set, follows
    /// `next` links until there are none; otherwise returns the first page.
    /// Arrays are concatenated, search results contribute their `items`.
    pub async fn paginate(&self, path: &str) -> GitHubResult<Vec<Value>> {
        let mut url = self.build_url(path);
        if let Some(per_page) = self.config.per_page {
            url = with_per_page(&url, per_page)?;
        }

        let mut items = Vec::new();
        let mut visited = HashSet::new();
        loop {
            let response = self.get(&url).await?;
            visited.insert(url);
            let next = response.links.next.clone();
            if let Document::Json(resource) = response.document {
                items.extend(page_items(resource.into_value()));
            }

            match next {
                Some(next) if self.config.auto_paginate && !visited.contains(&next) => url = next,
                _ => break,
            }
        }

        tracing::debug!(pages = visited.len(), items = items.len(), "Pagination complete");
        Ok(items)
    }

    /// Fetches and parses an Atom or RSS feed.
    pub async fn feed(&self, url: &str) -> GitHubResult<Feed> {
        let request = self.prepare(Method::GET, url, None, Some(FEED_MEDIA_TYPE))?;
        let response = self.execute(request).await?;
        match response.document {
            Document::Feed(feed) => Ok(feed),
            // Feed parsing disabled on the pipeline, or an unexpected content type.
            Document::Text(text) => parse_feed(&text).map_err(|e| {
                e.with_status(response.status)
                    .with_request(response.method.as_str(), &response.url)
            }),
            _ => Err(GitHubError::parser("Response is not a feed")
                .with_status(response.status)
                .with_request(response.method.as_str(), &response.url)),
        }
    }

    // Internal methods

    fn build_url(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            return path.to_string();
        }
        let base = self.config.api_endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn prepare(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
        accept: Option<&str>,
    ) -> GitHubResult<PreparedRequest> {
        let mut request = PreparedRequest::new(method, self.build_url(path));
        request
            .headers
            .insert(USER_AGENT, header_value(&self.config.user_agent)?);
        request.headers.insert(
            ACCEPT,
            header_value(accept.unwrap_or(&self.config.default_media_type))?,
        );
        if let Some(body) = body {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            request.body = Some(body);
        }
        self.auth.apply(&mut request)?;
        Ok(request)
    }

    async fn execute(&self, request: PreparedRequest) -> GitHubResult<Response> {
        let method = request.method.to_string();
        let url = request.url.clone();
        TracingHooks::on_request_start(&method, &url, self.auth.name());
        TracingHooks::on_request_headers(&request.headers);
        let timer = RequestTimer::new(Arc::clone(&self.metrics));

        let result = self
            .retry
            .execute_observed(
                || self.attempt(request.clone()),
                |event| {
                    self.metrics.record_retry();
                    TracingHooks::on_retry(&method, &url, event.attempt, event.delay);
                },
            )
            .await;

        match result {
            Ok(response) => {
                let duration = timer.success();
                TracingHooks::on_request_complete(&method, &url, response.status, duration);
                Ok(response)
            }
            Err(error) => {
                timer.failure();
                TracingHooks::on_request_error(&method, &url, &error.to_string());
                Err(error)
            }
        }
    }

    async fn attempt(&self, request: PreparedRequest) -> GitHubResult<Response> {
        let raw = self.transport.send(request).await?;
        let processed = self.pipeline.run(raw)?;
        Response::from_http(processed)
    }
}

fn header_value(value: &str) -> GitHubResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        GitHubError::configuration(format!("Invalid header value {:?}: {}", value, e))
            .with_cause(e)
    })
}

fn encode_body<B: Serialize>(body: &B) -> GitHubResult<Bytes> {
    serde_json::to_vec(body).map(Bytes::from).map_err(|e| {
        GitHubError::configuration(format!("Failed to serialize request body: {}", e))
            .with_cause(e)
    })
}

/// Builder for GitHubClient.
pub struct GitHubClientBuilder {
    config_builder: GitHubConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
    retry_policy: Option<RetryPolicy>,
    pipeline: Option<ResponsePipeline>,
}

impl GitHubClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::from_config_builder(GitHubConfig::builder())
    }

    /// Starts from an existing configuration builder, e.g.
    /// [`GitHubConfigBuilder::from_env`].
    pub fn from_config_builder(config_builder: GitHubConfigBuilder) -> Self {
        Self {
            config_builder,
            transport: None,
            retry_policy: None,
            pipeline: None,
        }
    }

    /// Sets the API endpoint.
    pub fn api_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.api_endpoint(url);
        self
    }

    /// Sets login and password.
    pub fn basic_auth(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.basic_auth(login, password);
        self
    }

    /// Sets login and personal token.
    pub fn personal_token(mut self, login: impl Into<String>, token: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.personal_token(login, token);
        self
    }

    /// Sets an OAuth access token.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.access_token(token);
        self
    }

    /// Sets a bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.bearer_token(token);
        self
    }

    /// Sets the OAuth application's client id and secret.
    pub fn client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.config_builder = self.config_builder.client_credentials(client_id, client_secret);
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets the page size and enables following `next` links.
    pub fn auto_paginate(mut self, per_page: u32) -> Self {
        self.config_builder = self.config_builder.per_page(per_page).auto_paginate(true);
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.config_builder = self.config_builder.no_retry();
        self
    }

    /// Replaces the retry policy derived from configuration.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Replaces the standard response pipeline.
    pub fn pipeline(mut self, pipeline: ResponsePipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Sends requests through a custom transport.
    pub fn transport(mut self, transport: impl HttpTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the client.
    pub fn build(self) -> GitHubResult<GitHubClient> {
        let config = self.config_builder.build()?;
        let budget = config.request_budget;
        let mut client = match self.transport {
            Some(transport) => GitHubClient::with_transport(config, transport)?,
            None => GitHubClient::new(config)?,
        };
        if let Some(policy) = self.retry_policy {
            client.retry = RetryExecutor::new(policy).with_budget(budget);
        }
        if let Some(pipeline) = self.pipeline {
            client.pipeline = pipeline;
        }
        Ok(client)
    }
}

impl Default for GitHubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
