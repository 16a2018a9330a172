//! Authentication strategies for GitHub API.
//!
//! A client holds one [`Credentials`] snapshot. [`AuthStrategy::resolve`]
//! picks exactly one way of signing requests from it, first match wins:
//!
//! 1. login + personal token: basic auth as `login/token`
//! 2. login + password: basic auth
//! 3. OAuth access token: `Authorization: token ...` or `access_token` query
//! 4. bearer token (JWT): `Authorization: Bearer ...`
//! 5. client id + secret: basic auth as the application
//! 6. anonymous

use crate::errors::{GitHubError, GitHubResult};
use crate::transport::PreparedRequest;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Credentials configured on a client. Empty strings count as unset.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Account login.
    pub login: Option<String>,
    /// Account password.
    pub password: Option<SecretString>,
    /// Personal token paired with `login`.
    pub token: Option<SecretString>,
    /// OAuth access token.
    pub access_token: Option<SecretString>,
    /// Bearer token, typically a GitHub App JWT.
    pub bearer_token: Option<SecretString>,
    /// OAuth application client id.
    pub client_id: Option<String>,
    /// OAuth application client secret.
    pub client_secret: Option<SecretString>,
}

impl Credentials {
    /// No credentials.
    pub fn none() -> Self {
        Self::default()
    }

    /// Login and password.
    pub fn basic(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self::default().with_login(login).with_password(password)
    }

    /// Login and personal token.
    pub fn personal_token(login: impl Into<String>, token: impl Into<String>) -> Self {
        Self::default().with_login(login).with_token(token)
    }

    /// OAuth access token.
    pub fn oauth(access_token: impl Into<String>) -> Self {
        Self::default().with_access_token(access_token)
    }

    /// Bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::default().with_bearer_token(token)
    }

    /// OAuth application id and secret.
    pub fn application(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::default().with_client_credentials(client_id, client_secret)
    }

    /// Sets the login.
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    /// Sets the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Sets the personal token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::new(token.into()));
        self
    }

    /// Sets the OAuth access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::new(token.into()));
        self
    }

    /// Sets the bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(SecretString::new(token.into()));
        self
    }

    /// Sets the application id and secret.
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Checks that paired fields are set together.
    pub fn validate(&self) -> GitHubResult<()> {
        let login = present(&self.login).is_some();
        if present_secret(&self.password).is_some() && !login {
            return Err(GitHubError::configuration("password requires login"));
        }
        if present_secret(&self.token).is_some() && !login {
            return Err(GitHubError::configuration("token requires login"));
        }
        let id = present(&self.client_id).is_some();
        let secret = present_secret(&self.client_secret).is_some();
        if id != secret {
            return Err(GitHubError::configuration(
                "client_id and client_secret must be set together",
            ));
        }
        Ok(())
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn present_secret(value: &Option<SecretString>) -> Option<&SecretString> {
    value.as_ref().filter(|v| !v.expose_secret().is_empty())
}

/// Where an OAuth access token is placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenPlacement {
    /// `Authorization: token <access_token>`.
    #[default]
    Header,
    /// `?access_token=<access_token>`.
    Query,
}

/// Resolved request-signing strategy.
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    /// Basic auth with `login/token` as user and the token as password.
    PersonalToken {
        /// Account login.
        login: String,
        /// Personal token.
        token: SecretString,
    },
    /// Basic auth with login and password.
    Basic {
        /// Account login.
        login: String,
        /// Account password.
        password: SecretString,
    },
    /// OAuth access token.
    OAuth {
        /// Access token.
        token: SecretString,
        /// Header or query placement.
        placement: TokenPlacement,
    },
    /// `Authorization: Bearer`.
    Bearer {
        /// Bearer token.
        token: SecretString,
    },
    /// Basic auth with the application's id and secret.
    Application {
        /// Client id.
        client_id: String,
        /// Client secret.
        client_secret: SecretString,
    },
    /// Unauthenticated.
    Anonymous,
}

impl AuthStrategy {
    /// Picks the highest-priority strategy the credentials support.
    pub fn resolve(credentials: &Credentials, placement: TokenPlacement) -> Self {
        let login = present(&credentials.login);

        if let (Some(login), Some(token)) = (login, present_secret(&credentials.token)) {
            return Self::PersonalToken {
                login: login.to_string(),
                token: token.clone(),
            };
        }
        if let (Some(login), Some(password)) = (login, present_secret(&credentials.password)) {
            return Self::Basic {
                login: login.to_string(),
                password: password.clone(),
            };
        }
        if let Some(token) = present_secret(&credentials.access_token) {
            return Self::OAuth {
                token: token.clone(),
                placement,
            };
        }
        if let Some(token) = present_secret(&credentials.bearer_token) {
            return Self::Bearer {
                token: token.clone(),
            };
        }
        if let (Some(id), Some(secret)) = (
            present(&credentials.client_id),
            present_secret(&credentials.client_secret),
        ) {
            return Self::Application {
                client_id: id.to_string(),
                client_secret: secret.clone(),
            };
        }
        Self::Anonymous
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PersonalToken { .. } => "personal_token",
            Self::Basic { .. } => "basic",
            Self::OAuth { .. } => "oauth",
            Self::Bearer { .. } => "bearer",
            Self::Application { .. } => "application",
            Self::Anonymous => "anonymous",
        }
    }

    /// True unless anonymous.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    /// True for login-based basic auth (password or personal token).
    pub fn is_basic(&self) -> bool {
        matches!(self, Self::PersonalToken { .. } | Self::Basic { .. })
    }

    /// True for OAuth token auth.
    pub fn is_token(&self) -> bool {
        matches!(self, Self::OAuth { .. })
    }

    /// True for bearer auth.
    pub fn is_bearer(&self) -> bool {
        matches!(self, Self::Bearer { .. })
    }

    /// True for application (client id/secret) auth.
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    /// True when requests act as a user rather than an app or nobody.
    pub fn is_user(&self) -> bool {
        self.is_basic() || self.is_token()
    }

    /// Signs a request.
    pub fn apply(&self, request: &mut PreparedRequest) -> GitHubResult<()> {
        let value = match self {
            Self::PersonalToken { login, token } => {
                basic_header(&format!("{}/token", login), token.expose_secret())
            }
            Self::Basic { login, password } => basic_header(login, password.expose_secret()),
            Self::OAuth {
                token,
                placement: TokenPlacement::Header,
            } => format!("token {}", token.expose_secret()),
            Self::OAuth {
                token,
                placement: TokenPlacement::Query,
            } => {
                let mut url = Url::parse(&request.url).map_err(|e| {
                    GitHubError::configuration(format!("Invalid request URL: {}", e)).with_cause(e)
                })?;
                // Next links echoed by the server already carry the token.
                if url.query_pairs().any(|(name, _)| name == "access_token") {
                    return Ok(());
                }
                url.query_pairs_mut()
                    .append_pair("access_token", token.expose_secret());
                request.url = url.to_string();
                return Ok(());
            }
            Self::Bearer { token } => format!("Bearer {}", token.expose_secret()),
            Self::Application {
                client_id,
                client_secret,
            } => basic_header(client_id, client_secret.expose_secret()),
            Self::Anonymous => return Ok(()),
        };

        let mut header = HeaderValue::from_str(&value).map_err(|_| {
            GitHubError::configuration("Credentials contain characters not allowed in a header")
        })?;
        header.set_sensitive(true);
        request.headers.insert(AUTHORIZATION, header);
        Ok(())
    }
}

fn basic_header(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn signed(strategy: &AuthStrategy) -> PreparedRequest {
        let mut request = PreparedRequest::new(Method::GET, "https://api.github.com/user");
        strategy.apply(&mut request).unwrap();
        request
    }

    fn authorization(request: &PreparedRequest) -> Option<&str> {
        request
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_personal_token_wins_over_access_token() {
        let credentials = Credentials::personal_token("octocat", "pt")
            .with_access_token("oauth");
        let strategy = AuthStrategy::resolve(&credentials, TokenPlacement::Header);
        assert_eq!(strategy.name(), "personal_token");

        let request = signed(&strategy);
        let expected = format!("Basic {}", STANDARD.encode("octocat/token:pt"));
        assert_eq!(authorization(&request), Some(expected.as_str()));
    }

    #[test]
    fn test_basic_auth() {
        let strategy = AuthStrategy::resolve(
            &Credentials::basic("octocat", "hunter2").with_bearer_token("jwt"),
            TokenPlacement::Header,
        );
        assert!(strategy.is_basic());
        assert!(strategy.is_user());
        let expected = format!("Basic {}", STANDARD.encode("octocat:hunter2"));
        assert_eq!(authorization(&signed(&strategy)), Some(expected.as_str()));
    }

    #[test]
    fn test_oauth_header_and_query() {
        let credentials = Credentials::oauth("gho_abc").with_bearer_token("jwt");

        let header = AuthStrategy::resolve(&credentials, TokenPlacement::Header);
        assert!(header.is_token());
        assert_eq!(authorization(&signed(&header)), Some("token gho_abc"));

        let query = AuthStrategy::resolve(&credentials, TokenPlacement::Query);
        let request = signed(&query);
        assert_eq!(authorization(&request), None);
        assert_eq!(request.url, "https://api.github.com/user?access_token=gho_abc");
    }

    #[test]
    fn test_query_token_not_appended_twice() {
        let strategy = AuthStrategy::resolve(&Credentials::oauth("gho_abc"), TokenPlacement::Query);
        let mut request = PreparedRequest::new(
            Method::GET,
            "https://api.github.com/user/repos?page=2&access_token=gho_abc",
        );
        strategy.apply(&mut request).unwrap();
        assert_eq!(
            request.url,
            "https://api.github.com/user/repos?page=2&access_token=gho_abc"
        );
    }

    #[test]
    fn test_bearer() {
        let strategy = AuthStrategy::resolve(
            &Credentials::bearer("eyJ").with_client_credentials("id", "secret"),
            TokenPlacement::Header,
        );
        assert!(strategy.is_bearer());
        assert!(!strategy.is_user());
        assert_eq!(authorization(&signed(&strategy)), Some("Bearer eyJ"));
    }

    #[test]
    fn test_application() {
        let strategy =
            AuthStrategy::resolve(&Credentials::application("id", "secret"), TokenPlacement::Header);
        assert!(strategy.is_application());
        let expected = format!("Basic {}", STANDARD.encode("id:secret"));
        assert_eq!(authorization(&signed(&strategy)), Some(expected.as_str()));
    }

    #[test]
    fn test_empty_values_are_anonymous() {
        let credentials = Credentials::oauth("").with_login("");
        let strategy = AuthStrategy::resolve(&credentials, TokenPlacement::Header);
        assert!(!strategy.is_authenticated());
        assert_eq!(authorization(&signed(&strategy)), None);
    }

    #[test]
    fn test_password_without_login_is_ignored_and_invalid() {
        let credentials = Credentials::default().with_password("pw");
        let strategy = AuthStrategy::resolve(&credentials, TokenPlacement::Header);
        assert!(!strategy.is_authenticated());
        assert!(credentials.validate().is_err());
    }

    #[test]
    fn test_half_application_credentials_invalid() {
        let credentials = Credentials {
            client_id: Some("id".to_string()),
            ..Default::default()
        };
        assert!(credentials.validate().is_err());
        assert!(Credentials::application("id", "s").validate().is_ok());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", Credentials::basic("octocat", "hunter2"));
        assert!(debug.contains("octocat"));
        assert!(!debug.contains("hunter2"));
    }
}
