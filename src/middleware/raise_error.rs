//! First stage: turn error statuses into typed errors.

use super::ResponseStage;
use crate::errors::{GitHubError, GitHubResult};
use crate::transport::HttpResponse;

/// Classifies the status code and fails the response on a match.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaiseErrorStage;

impl ResponseStage for RaiseErrorStage {
    fn name(&self) -> &'static str {
        "raise_error"
    }

    fn on_complete(&self, response: HttpResponse) -> GitHubResult<HttpResponse> {
        match GitHubError::from_response(&response) {
            Some(error) => Err(error),
            None => Ok(response),
        }
    }
}
