//! Feed stage: replace Atom/RSS bodies with a parsed [`Feed`](crate::feed::Feed).

use super::media_type::MediaType;
use super::ResponseStage;
use crate::errors::GitHubResult;
use crate::feed::parse_feed;
use crate::transport::{HttpResponse, ResponseBody};

/// Parses feed-typed responses. Other responses pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedStage;

impl ResponseStage for FeedStage {
    fn name(&self) -> &'static str {
        "feed"
    }

    fn on_complete(&self, mut response: HttpResponse) -> GitHubResult<HttpResponse> {
        if !MediaType::from_response(&response).is_feed() {
            return Ok(response);
        }
        if let ResponseBody::Bytes(ref bytes) = response.body {
            if bytes.is_empty() {
                return Ok(response);
            }
            let feed = parse_feed(&response.text()).map_err(|e| {
                e.with_status(response.status)
                    .with_request(response.method.as_str(), &response.url)
            })?;
            response.body = ResponseBody::Feed(feed);
        }
        Ok(response)
    }
}
