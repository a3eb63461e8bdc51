//! Domain Errors
//!
//! Failures raised through the domain ports. Only [`FetchError`] can reach a
//! client; translation and cache failures are always recovered.

use thiserror::Error;

/// Failure to acquire a feed from the backends.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build upstream url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("bad status code: {0}")]
    Status(u16),

    #[error("failed to decode response into JSON feed: {0}")]
    Decode(String),

    #[error("empty group")]
    EmptyGroup,

    #[error("all attempts failed")]
    AllAttemptsFailed,

    #[error("failed to request feed: {0}")]
    Exhausted(Box<FetchError>),
}

/// Failure of a translation provider call.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("failed to execute request: {0}")]
    Request(String),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Failure of the translation cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("cache command failed: {0}")]
    Command(String),
}
