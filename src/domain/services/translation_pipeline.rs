//! Translation Pipeline
//!
//! Cache-aside translation of item fields. Each non-empty field of an item
//! is translated by its own task; the item is updated once all of them are
//! done. Failures never propagate: a field that cannot be translated keeps
//! its original text.

use crate::domain::entities::Item;
use crate::domain::ports::{TranslationCache, TranslationProvider};
use crate::domain::value_objects::{CacheKey, TranslatedField};
use crate::infrastructure::CircuitBreaker;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cache-aside translation of feed items.
///
/// Cloning is cheap: every collaborator is behind an `Arc`.
#[derive(Clone)]
pub struct TranslationPipeline {
    provider: Arc<dyn TranslationProvider>,
    cache: Arc<dyn TranslationCache>,
    breaker: Arc<CircuitBreaker>,
    key_prefix: Arc<str>,
    ttl: Duration,
}

impl TranslationPipeline {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        cache: Arc<dyn TranslationCache>,
        breaker: Arc<CircuitBreaker>,
        key_prefix: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            breaker,
            key_prefix: Arc::from(key_prefix.into()),
            ttl,
        }
    }

    /// Translate title, description and content of `item` into `target_lang`.
    ///
    /// Empty fields are skipped. Returns once every field task has finished.
    pub async fn translate_item(&self, item: &mut Item, target_lang: &str, platform: &str) {
        let mut tasks: Vec<(TranslatedField, JoinHandle<Option<String>>)> = Vec::with_capacity(3);

        for field in TranslatedField::ALL {
            let text = field_value(item, field);
            if text.is_empty() {
                continue;
            }
            tracing::debug!("translate item {} {}", item.id, field);

            let pipeline = self.clone();
            let text = text.to_string();
            let lang = target_lang.to_string();
            let platform = platform.to_string();
            let item_id = item.id.clone();
            tasks.push((
                field,
                tokio::spawn(async move {
                    pipeline
                        .translate_field(&text, &lang, &platform, &item_id, field)
                        .await
                }),
            ));
        }

        for (field, task) in tasks {
            match task.await {
                Ok(Some(translated)) => {
                    tracing::debug!("item {} {} translated", item.id, field);
                    *field_value_mut(item, field) = translated;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("translation task for {} {} failed: {}", item.id, field, e);
                }
            }
        }
    }

    /// Translate one field, going through the cache.
    ///
    /// Returns `None` when the provider fails; the caller keeps the original.
    pub async fn translate_field(
        &self,
        text: &str,
        target_lang: &str,
        platform: &str,
        item_id: &str,
        field: TranslatedField,
    ) -> Option<String> {
        let key = CacheKey::new(&self.key_prefix, platform, item_id, field, target_lang);

        if let Some(cached) = self.lookup(&key).await {
            tracing::debug!("valid translated result found key={}", key);
            return Some(cached);
        }

        tracing::debug!("sending {} to translation provider", key);
        let translated = match self.provider.translate(text, target_lang, field.is_html()).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::error!("failed to translate {} of item {}: {}", field, item_id, e);
                return None;
            }
        };

        self.store(&key, &translated).await;
        Some(translated)
    }

    async fn lookup(&self, key: &CacheKey) -> Option<String> {
        if !self.breaker.allow_request() {
            tracing::debug!("cache circuit open, skipping lookup of {}", key);
            return None;
        }

        match self.cache.get(key).await {
            Ok(value) => {
                self.breaker.record_success();
                value.filter(|v| !v.is_empty())
            }
            Err(e) => {
                self.breaker.record_failure();
                tracing::error!("failed to check translated result key={}: {}", key, e);
                None
            }
        }
    }

    async fn store(&self, key: &CacheKey, value: &str) {
        if !self.breaker.allow_request() {
            tracing::debug!("cache circuit open, not storing {}", key);
            return;
        }

        match self.cache.set(key, value, self.ttl).await {
            Ok(()) => self.breaker.record_success(),
            Err(e) => {
                self.breaker.record_failure();
                tracing::warn!("failed to save translated result key={}: {}", key, e);
            }
        }
    }
}

fn field_value(item: &Item, field: TranslatedField) -> &str {
    match field {
        TranslatedField::Title => &item.title,
        TranslatedField::Description => &item.description,
        TranslatedField::Content => &item.content,
    }
}

fn field_value_mut(item: &mut Item, field: TranslatedField) -> &mut String {
    match field {
        TranslatedField::Title => &mut item.title,
        TranslatedField::Description => &mut item.description,
        TranslatedField::Content => &mut item.content,
    }
}
