//! Redis Translation Cache
//!
//! Stores translated fields in Redis with `SET .. EX`, so translations are
//! shared between instances of this server and survive restarts.

use crate::domain::errors::CacheError;
use crate::domain::ports::TranslationCache;
use crate::domain::value_objects::CacheKey;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::Mutex;

/// Bound on connecting and on each command.
const DEFAULT_REDIS_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis-backed `TranslationCache`.
///
/// One multiplexed connection is opened lazily and shared by all calls; it
/// is dropped after a failed command and reopened on the next call. Connects
/// and commands give up after `timeout`, so an unreachable server shows up
/// as an error instead of a stall.
pub struct RedisTranslationCache {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    timeout: Duration,
}

impl RedisTranslationCache {
    /// Create a cache for `url` (e.g. `redis://127.0.0.1:6379/0`).
    ///
    /// Only the URL is validated here; no connection is made yet.
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            timeout: DEFAULT_REDIS_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = tokio::time::timeout(self.timeout, self.client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Unavailable("connect timed out".to_string()))?
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        tracing::info!("connected to redis translation cache");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        *self.conn.lock().await = None;
    }
}

#[async_trait]
impl TranslationCache for RedisTranslationCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let result = tokio::time::timeout(self.timeout, conn.get::<_, Option<String>>(key.as_str())).await;
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.reset().await;
                Err(CacheError::Command(e.to_string()))
            }
            Err(_) => {
                self.reset().await;
                Err(CacheError::Command("GET timed out".to_string()))
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let command = async {
            if ttl.is_zero() {
                conn.set::<_, _, ()>(key.as_str(), value).await
            } else {
                // EX takes whole seconds and rejects 0
                conn.set_ex::<_, _, ()>(key.as_str(), value, ttl.as_secs().max(1)).await
            }
        };
        match tokio::time::timeout(self.timeout, command).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.reset().await;
                Err(CacheError::Command(e.to_string()))
            }
            Err(_) => {
                self.reset().await;
                Err(CacheError::Command("SET timed out".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::TranslatedField;

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(matches!(
            RedisTranslationCache::new("not-a-redis-url"),
            Err(CacheError::Unavailable(_))
        ));
    }

    #[test]
    fn test_new_does_not_connect() {
        assert!(RedisTranslationCache::new("redis://127.0.0.1:1/0").is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let cache = RedisTranslationCache::new("redis://127.0.0.1:1/0").unwrap();
        let key = CacheKey::new("p:", "x", "1", TranslatedField::Title, "en");

        assert!(matches!(cache.get(&key).await, Err(CacheError::Unavailable(_))));
        assert!(matches!(
            cache.set(&key, "v", Duration::from_secs(10)).await,
            Err(CacheError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let cache = RedisTranslationCache::new(&format!("redis://{}/0", addr))
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        let key = CacheKey::new("p:", "x", "1", TranslatedField::Title, "en");

        let started = std::time::Instant::now();
        let get = tokio::time::timeout(Duration::from_secs(5), cache.get(&key))
            .await
            .unwrap();
        assert!(get.is_err());
        let set = tokio::time::timeout(Duration::from_secs(5), cache.set(&key, "v", Duration::ZERO))
            .await
            .unwrap();
        assert!(set.is_err());
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    /// Runs only when REDIS_URL points at a live server.
    #[tokio::test]
    async fn test_round_trip_against_live_redis() {
        let Ok(url) = std::env::var("REDIS_URL") else {
            return;
        };
        let cache = RedisTranslationCache::new(&url).unwrap();
        let key = CacheKey::new("feed-relay-test:", "x", "1", TranslatedField::Content, "fr");

        cache.set(&key, "bonjour", Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some("bonjour".to_string()));
    }
}
