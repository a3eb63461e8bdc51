//! In-Memory Translation Cache
//!
//! Process-local store used when no Redis URL is configured.

use crate::domain::errors::CacheError;
use crate::domain::ports::TranslationCache;
use crate::domain::value_objects::CacheKey;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    /// `None` never expires
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// DashMap-backed `TranslationCache` with per-entry expiry.
#[derive(Clone, Default)]
pub struct MemoryTranslationCache {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryTranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Start background cleanup task.
    pub fn start_cleanup_task(&self, interval: Duration) {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(
                        "cleanup: removed {} expired translations, {} remain",
                        removed,
                        cache.len()
                    );
                }
            }
        });
    }
}

#[async_trait]
impl TranslationCache for MemoryTranslationCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let value = match self.entries.get(key.as_str()) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => None,
            None => return Ok(None),
        };
        // expired: drop it outside of the read guard
        self.entries
            .remove_if(key.as_str(), |_, entry| !entry.is_live(now));
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: if ttl.is_zero() {
                    None
                } else {
                    Some(Instant::now() + ttl)
                },
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::TranslatedField;

    fn key(id: &str) -> CacheKey {
        CacheKey::new("p:", "twitter", id, TranslatedField::Title, "fr")
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = MemoryTranslationCache::new();
        assert_eq!(cache.get(&key("1")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryTranslationCache::new();
        cache.set(&key("1"), "Bonjour", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&key("1")).await.unwrap(), Some("Bonjour".to_string()));
        assert_eq!(cache.get(&key("2")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let cache = MemoryTranslationCache::new();
        cache.set(&key("1"), "a", Duration::from_secs(60)).await.unwrap();
        cache.set(&key("1"), "b", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&key("1")).await.unwrap(), Some("b".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_and_removed() {
        let cache = MemoryTranslationCache::new();
        cache.set(&key("1"), "old", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get(&key("1")).await.unwrap(), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_expires() {
        let cache = MemoryTranslationCache::new();
        cache.set(&key("1"), "kept", Duration::ZERO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.get(&key("1")).await.unwrap(), Some("kept".to_string()));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = MemoryTranslationCache::new();
        cache.set(&key("old"), "x", Duration::from_millis(10)).await.unwrap();
        cache.set(&key("new"), "y", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}
