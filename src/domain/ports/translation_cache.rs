//! Translation Cache Port
//!
//! Defines the interface to the key-value store holding translated fields.

use crate::domain::errors::CacheError;
use crate::domain::value_objects::CacheKey;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value store for translated text.
///
/// The store owns expiry: a value written with a TTL must stop being
/// returned once the TTL has elapsed. A zero TTL means no expiry.
#[async_trait]
pub trait TranslationCache: Send + Sync {
    /// Look up a translation. `Ok(None)` is a miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    /// Store a translation with the given time-to-live.
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheError>;
}
