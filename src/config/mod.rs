//! Configuration types for the GitHub client.
//!
//! A [`GitHubConfig`] is built once, validated, and then only read. There is
//! no process-wide default; [`GitHubConfigBuilder::from_env`] is the explicit
//! way to pick up `OCTOKIT_*` environment variables.

use crate::auth::{Credentials, TokenPlacement};
use crate::errors::{ErrorClass, GitHubError, GitHubResult};
use crate::resilience::{Backoff, ExponentialBackoff, FixedBackoff, RetryPolicy};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Default GitHub API endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.github.com";

/// Default GitHub web endpoint.
pub const DEFAULT_WEB_ENDPOINT: &str = "https://github.com";

/// Default media type sent in `Accept`.
pub const DEFAULT_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default overall budget for one logical request, retries included.
pub const DEFAULT_REQUEST_BUDGET: Duration = Duration::from_secs(120);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = "integrations-octokit/0.1.0";

/// Largest page size GitHub accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Backoff between retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffConfig {
    /// Same delay every time.
    Fixed(Duration),
    /// Delay grows by `multiplier` per attempt, capped at `max`.
    Exponential {
        /// First delay.
        initial: Duration,
        /// Upper bound.
        max: Duration,
        /// Growth factor.
        multiplier: f64,
        /// Jitter factor (0.0 to 1.0).
        jitter: f64,
    },
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::Exponential {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Error families that trigger another attempt.
    pub retry_on: HashSet<ErrorClass>,
    /// Delay between attempts.
    pub backoff: BackoffConfig,
    /// Enable retries.
    pub enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_on: [ErrorClass::Server, ErrorClass::Network].into_iter().collect(),
            backoff: BackoffConfig::default(),
            enabled: true,
        }
    }
}

impl RetryConfig {
    /// Builds the retry policy this configuration describes.
    pub fn policy(&self) -> RetryPolicy {
        let backoff: Arc<dyn Backoff> = match self.backoff {
            BackoffConfig::Fixed(delay) => Arc::new(FixedBackoff::new(delay)),
            BackoffConfig::Exponential {
                initial,
                max,
                multiplier,
                jitter,
            } => Arc::new(ExponentialBackoff::new(initial, max, multiplier, jitter)),
        };
        let max_attempts = if self.enabled { self.max_attempts } else { 1 };
        RetryPolicy::new(max_attempts, self.retry_on.clone(), backoff)
    }
}

/// GitHub client configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// REST API endpoint.
    pub api_endpoint: String,
    /// Web endpoint.
    pub web_endpoint: String,
    /// User-Agent header.
    pub user_agent: String,
    /// Default `Accept` media type.
    pub default_media_type: String,
    /// Credentials; resolved to one strategy when the client is built.
    pub credentials: Credentials,
    /// Placement of OAuth access tokens.
    pub oauth_token_placement: TokenPlacement,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Upper bound on one logical request, retry waits included.
    pub request_budget: Duration,
    /// Retry configuration.
    pub retry: RetryConfig,
    /// Page size sent as `per_page`.
    pub per_page: Option<u32>,
    /// Follow `next` links when paginating.
    pub auto_paginate: bool,
    /// Verify TLS certificates.
    pub verify_ssl: bool,
    /// Run the feed stage on Atom/RSS responses.
    pub parse_feeds: bool,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            web_endpoint: DEFAULT_WEB_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_media_type: DEFAULT_MEDIA_TYPE.to_string(),
            credentials: Credentials::default(),
            oauth_token_placement: TokenPlacement::default(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_budget: DEFAULT_REQUEST_BUDGET,
            retry: RetryConfig::default(),
            per_page: None,
            auto_paginate: false,
            verify_ssl: true,
            parse_feeds: true,
        }
    }
}

impl GitHubConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> GitHubConfigBuilder {
        GitHubConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> GitHubResult<()> {
        for (name, endpoint) in [
            ("api_endpoint", &self.api_endpoint),
            ("web_endpoint", &self.web_endpoint),
        ] {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(GitHubError::configuration(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }

        if self.user_agent.is_empty() {
            return Err(GitHubError::configuration("User-Agent is required by GitHub API"));
        }

        if self.retry.max_attempts == 0 {
            return Err(GitHubError::configuration("max_attempts must be at least 1"));
        }

        if let Some(per_page) = self.per_page {
            if per_page == 0 || per_page > MAX_PER_PAGE {
                return Err(GitHubError::configuration(format!(
                    "per_page must be between 1 and {}",
                    MAX_PER_PAGE
                )));
            }
        }

        self.credentials.validate()
    }
}

/// Builder for GitHubConfig.
#[derive(Debug, Default)]
pub struct GitHubConfigBuilder {
    api_endpoint: Option<String>,
    web_endpoint: Option<String>,
    user_agent: Option<String>,
    default_media_type: Option<String>,
    credentials: Credentials,
    oauth_token_placement: TokenPlacement,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    request_budget: Option<Duration>,
    retry: Option<RetryConfig>,
    per_page: Option<u32>,
    auto_paginate: bool,
    verify_ssl: Option<bool>,
    parse_feeds: Option<bool>,
}

impl GitHubConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded from `OCTOKIT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates a builder seeded from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let mut builder = Self::new();

        let mut credentials = Credentials::default();
        credentials.login = var("OCTOKIT_LOGIN");
        if let Some(password) = var("OCTOKIT_PASSWORD") {
            credentials = credentials.with_password(password);
        }
        if let Some(token) = var("OCTOKIT_TOKEN") {
            credentials = credentials.with_token(token);
        }
        if let Some(token) = var("OCTOKIT_ACCESS_TOKEN") {
            credentials = credentials.with_access_token(token);
        }
        if let Some(token) = var("OCTOKIT_BEARER_TOKEN") {
            credentials = credentials.with_bearer_token(token);
        }
        credentials.client_id = var("OCTOKIT_CLIENT_ID");
        if let Some(secret) = var("OCTOKIT_SECRET") {
            credentials.client_secret = Some(secrecy::SecretString::new(secret));
        }
        builder.credentials = credentials;

        builder.api_endpoint = var("OCTOKIT_API_ENDPOINT");
        builder.web_endpoint = var("OCTOKIT_WEB_ENDPOINT");
        builder.user_agent = var("OCTOKIT_USER_AGENT");
        builder.default_media_type = var("OCTOKIT_DEFAULT_MEDIA_TYPE");
        builder.per_page = var("OCTOKIT_PER_PAGE").and_then(|v| v.parse().ok());
        builder.auto_paginate = var("OCTOKIT_AUTO_PAGINATE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        builder
    }

    /// Sets the API endpoint.
    pub fn api_endpoint(mut self, url: impl Into<String>) -> Self {
        self.api_endpoint = Some(url.into());
        self
    }

    /// Sets the web endpoint.
    pub fn web_endpoint(mut self, url: impl Into<String>) -> Self {
        self.web_endpoint = Some(url.into());
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the default `Accept` media type.
    pub fn default_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.default_media_type = Some(media_type.into());
        self
    }

    /// Replaces the credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets login and password.
    pub fn basic_auth(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = self.credentials.with_login(login).with_password(password);
        self
    }

    /// Sets login and personal token.
    pub fn personal_token(mut self, login: impl Into<String>, token: impl Into<String>) -> Self {
        self.credentials = self.credentials.with_login(login).with_token(token);
        self
    }

    /// Sets the OAuth access token.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = self.credentials.with_access_token(token);
        self
    }

    /// Sets the bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = self.credentials.with_bearer_token(token);
        self
    }

    /// Sets the application id and secret.
    pub fn client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.credentials = self
            .credentials
            .with_client_credentials(client_id, client_secret);
        self
    }

    /// Sets where OAuth access tokens go.
    pub fn oauth_token_placement(mut self, placement: TokenPlacement) -> Self {
        self.oauth_token_placement = placement;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the overall request budget.
    pub fn request_budget(mut self, budget: Duration) -> Self {
        self.request_budget = Some(budget);
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Sets total attempts, keeping the rest of the retry configuration.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        let mut retry = self.retry.take().unwrap_or_default();
        retry.max_attempts = attempts;
        self.retry = Some(retry);
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.retry = Some(RetryConfig {
            enabled: false,
            ..Default::default()
        });
        self
    }

    /// Sets the page size.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Enables or disables auto pagination.
    pub fn auto_paginate(mut self, enabled: bool) -> Self {
        self.auto_paginate = enabled;
        self
    }

    /// Enables or disables TLS verification.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    /// Enables or disables the feed stage.
    pub fn parse_feeds(mut self, enabled: bool) -> Self {
        self.parse_feeds = Some(enabled);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> GitHubResult<GitHubConfig> {
        let config = GitHubConfig {
            api_endpoint: self
                .api_endpoint
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            web_endpoint: self
                .web_endpoint
                .unwrap_or_else(|| DEFAULT_WEB_ENDPOINT.to_string()),
            user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            default_media_type: self
                .default_media_type
                .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string()),
            credentials: self.credentials,
            oauth_token_placement: self.oauth_token_placement,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            request_budget: self.request_budget.unwrap_or(DEFAULT_REQUEST_BUDGET),
            retry: self.retry.unwrap_or_default(),
            per_page: self.per_page,
            auto_paginate: self.auto_paginate,
            verify_ssl: self.verify_ssl.unwrap_or(true),
            parse_feeds: self.parse_feeds.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
