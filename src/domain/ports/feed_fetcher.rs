//! Feed Fetcher Port
//!
//! Defines the interface for retrieving a JSON feed from one backend instance.

use crate::domain::entities::Instance;
use crate::domain::errors::FetchError;
use crate::domain::json_feed::JsonFeed;
use async_trait::async_trait;

/// Single fetch attempt against one backend instance.
///
/// This is an outbound port used by the load balancer. An implementation
/// makes exactly one attempt (no retries); the load balancer decides which
/// instances to try and when.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch `request_path` (path plus optional query) from `instance`.
    ///
    /// Any non-200 status, transport error, timeout or undecodable body is a
    /// failure of this attempt.
    async fn fetch(&self, instance: &Instance, request_path: &str) -> Result<JsonFeed, FetchError>;
}
