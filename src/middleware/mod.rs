//! Response middleware chain.
//!
//! Every response passes through an ordered list of stages before the
//! caller sees it. A stage takes ownership of the response and either hands
//! it on (possibly rewritten) or fails with a typed error, which stops the
//! chain.
//!
//! The standard order is:
//!
//! 1. [`RaiseErrorStage`] classifies the status code.
//! 2. [`EncodingStage`] forces the advertised charset and decodes base64
//!    `content` fields.
//! 3. [`FeedStage`] parses Atom/RSS bodies (when feed parsing is enabled).

mod encoding;
mod feed;
mod media_type;
mod raise_error;

pub use encoding::{EncodingStage, DECODED_ENCODING};
pub use feed::FeedStage;
pub use media_type::{MediaType, GITHUB_MEDIA_TYPE_HEADER};
pub use raise_error::RaiseErrorStage;

use crate::errors::GitHubResult;
use crate::transport::HttpResponse;
use std::fmt;
use std::sync::Arc;

/// One step of the response pipeline.
pub trait ResponseStage: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Processes a completed response.
    fn on_complete(&self, response: HttpResponse) -> GitHubResult<HttpResponse>;
}

/// Ordered list of response stages.
#[derive(Clone, Default)]
pub struct ResponsePipeline {
    stages: Vec<Arc<dyn ResponseStage>>,
}

impl fmt::Debug for ResponsePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}

impl ResponsePipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the standard pipeline.
    pub fn standard(parse_feeds: bool) -> Self {
        let pipeline = Self::new()
            .with_stage(RaiseErrorStage)
            .with_stage(EncodingStage);
        if parse_feeds {
            pipeline.with_stage(FeedStage)
        } else {
            pipeline
        }
    }

    /// Appends a stage.
    pub fn with_stage(mut self, stage: impl ResponseStage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Names of the stages in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage in order, stopping at the first error.
    pub fn run(&self, response: HttpResponse) -> GitHubResult<HttpResponse> {
        self.stages.iter().try_fold(response, |response, stage| {
            tracing::trace!(stage = stage.name(), status = response.status, "Response stage");
            stage.on_complete(response)
        })
    }
}
