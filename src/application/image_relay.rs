//! Image Relay
//!
//! Fetches an image on behalf of a reader, adding the Origin/Referer headers
//! the image host requires for the platform, and hands the upstream response
//! back for streaming.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Header overrides for one platform.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RelayRule {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub referer: Option<String>,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("missing image source")]
    MissingSource,

    #[error("invalid image source {0}: {1}")]
    InvalidSource(String, url::ParseError),

    #[error("unsupported image source scheme: {0}")]
    UnsupportedScheme(String),

    #[error("failed to fetch image: {0}")]
    Request(#[from] reqwest::Error),
}

/// Upstream image response, body not yet read.
#[derive(Debug)]
pub struct RelayResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub upstream: reqwest::Response,
}

/// Relays image requests to their original hosts.
pub struct ImageRelay {
    client: reqwest::Client,
    rules: HashMap<String, RelayRule>,
}

impl ImageRelay {
    pub fn new(rules: HashMap<String, RelayRule>) -> Self {
        Self::with_client(reqwest::Client::new(), rules)
    }

    pub fn with_client(client: reqwest::Client, rules: HashMap<String, RelayRule>) -> Self {
        Self { client, rules }
    }

    /// Header overrides configured for `platform`, if any.
    pub fn rule(&self, platform: &str) -> Option<&RelayRule> {
        self.rules.get(platform)
    }

    /// Issue the outbound GET for `src` with the overrides for `platform`.
    ///
    /// No retry. The upstream status is passed through as is, including
    /// error statuses; only failing to send the request is an error.
    pub async fn relay(&self, src: Option<&str>, platform: &str) -> Result<RelayResponse, RelayError> {
        let src = src.filter(|s| !s.is_empty()).ok_or(RelayError::MissingSource)?;
        let url = url::Url::parse(src).map_err(|e| RelayError::InvalidSource(src.to_string(), e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RelayError::UnsupportedScheme(url.scheme().to_string()));
        }

        let mut request = self.client.get(url);
        if let Some(rule) = self.rule(platform) {
            if let Some(origin) = &rule.origin {
                request = request.header("Origin", origin);
            }
            if let Some(referer) = &rule.referer {
                request = request.header("Referer", referer);
            }
        }

        let upstream = request.send().await.map_err(|e| {
            tracing::error!("image proxy execute request src={} platform={}: {}", src, platform, e);
            RelayError::from(e)
        })?;

        let status = upstream.status().as_u16();
        let content_type = upstream
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        tracing::debug!("relayed image src={} status={}", src, status);

        Ok(RelayResponse {
            status,
            content_type,
            upstream,
        })
    }
}
