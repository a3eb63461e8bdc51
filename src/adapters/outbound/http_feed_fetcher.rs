//! HTTP Feed Fetcher
//!
//! Requests a feed from one backend instance over HTTP, always asking for
//! the JSON Feed format.

use crate::domain::entities::Instance;
use crate::domain::errors::FetchError;
use crate::domain::json_feed::JsonFeed;
use crate::domain::ports::FeedFetcher;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// `FeedFetcher` backed by a shared `reqwest` client.
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    /// Build the upstream URL for `request_path` on `instance`.
    ///
    /// Query parameters from the request are kept, except `format`, which
    /// is always `json`.
    pub fn upstream_url(instance: &Instance, request_path: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!("{}{}", instance.url, request_path))
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "format")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("format", "json");

        Ok(url)
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, instance: &Instance, request_path: &str) -> Result<JsonFeed, FetchError> {
        let url = Self::upstream_url(instance, request_path)?;
        tracing::debug!("start fetch feed url={}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Request(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::Status(status));
        }

        response
            .json::<JsonFeed>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}
