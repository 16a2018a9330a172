//! # GitHub API Client Core
//!
//! The request/response core of a GitHub API client:
//! - A typed error taxonomy derived from HTTP status and response body
//! - An ordered response middleware chain (error raising, charset and
//!   base64 content decoding, Atom/RSS feed parsing)
//! - Authentication strategy resolution from configured credentials
//! - Retry with backoff, bounded by a per-request time budget
//! - Secret redaction in error messages, URLs and logs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_octokit::GitHubClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GitHubClient::builder()
//!         .access_token("gho_xxxxxxxxxxxx")
//!         .build()?;
//!
//!     let response = client.get("/repos/octokit/octokit.rb/contents/LICENSE").await?;
//!     if let Some(file) = response.resource() {
//!         println!("{}", file.str_field("content").unwrap_or_default());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod redact;
pub mod types;

// Authentication
pub mod auth;

// HTTP client and transport
pub mod client;
pub mod response;
pub mod transport;

// Response processing
pub mod feed;
pub mod middleware;

// Pagination handling
pub mod pagination;

// Resilience patterns
pub mod resilience;

// Observability
pub mod observability;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use auth::{AuthStrategy, Credentials, TokenPlacement};
pub use client::{GitHubClient, GitHubClientBuilder};
pub use config::{GitHubConfig, GitHubConfigBuilder};
pub use errors::{ErrorClass, GitHubError, GitHubErrorKind, GitHubResult};
pub use feed::Feed;
pub use middleware::{ResponsePipeline, ResponseStage};
pub use pagination::PaginationLinks;
pub use resilience::{RetryExecutor, RetryPolicy};
pub use response::{Document, Resource, Response};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::*;
