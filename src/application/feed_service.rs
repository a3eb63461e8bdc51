//! Feed Service - Main application use case
//!
//! Orchestrates one feed request: fetch from the backends, enrich the items
//! (translation, image rewriting) and render the requested format. This is
//! the primary interface for the inbound HTTP adapter.

use crate::application::renderer::{render, RenderError, RenderedFeed};
use crate::domain::entities::Feed;
use crate::domain::errors::FetchError;
use crate::domain::services::{ImageRewriter, LoadBalancer, TranslationPipeline};
use crate::domain::value_objects::{target_language, OutputFormat};
use std::sync::Arc;
use thiserror::Error;

/// Failure of a feed request. Either one maps to a 500 for the client.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Translation settings bound to the host the request came in on.
#[derive(Clone)]
pub struct HostTranslation {
    pipeline: TranslationPipeline,
    host_base: String,
}

impl HostTranslation {
    pub fn new(pipeline: TranslationPipeline, host_base: impl Into<String>) -> Self {
        Self {
            pipeline,
            host_base: host_base.into(),
        }
    }
}

/// Feed service - main application use case.
pub struct FeedService {
    balancer: Arc<LoadBalancer>,
    translation: Option<HostTranslation>,
    images: Option<ImageRewriter>,
}

impl FeedService {
    pub fn new(balancer: Arc<LoadBalancer>) -> Self {
        Self {
            balancer,
            translation: None,
            images: None,
        }
    }

    /// Enable translation for hosts under `host_base`.
    pub fn with_translation(mut self, translation: HostTranslation) -> Self {
        self.translation = Some(translation);
        self
    }

    /// Enable image URL rewriting.
    pub fn with_image_rewriter(mut self, rewriter: ImageRewriter) -> Self {
        self.images = Some(rewriter);
        self
    }

    /// Serve a feed request.
    ///
    /// # Arguments
    /// * `request_path` - path (and query) to request from the backends
    /// * `platform` - first path segment, used for instance affinity
    /// * `host` - Host header of the request, used for language detection
    /// * `format` - requested output format
    pub async fn serve(
        &self,
        request_path: &str,
        platform: &str,
        host: &str,
        format: OutputFormat,
    ) -> Result<RenderedFeed, ServeError> {
        let mut feed = self.balancer.fetch(request_path, platform).await.map_err(|e| {
            tracing::error!("failed to fetch feed: {}", e);
            e
        })?;

        tracing::debug!("raw feed title={} items={}", feed.title, feed.items.len());

        self.enrich(&mut feed, host, platform).await;

        tracing::debug!("start re-construct format={}", format);
        let rendered = render(&feed, format).map_err(|e| {
            tracing::error!("failed to format feed: {}", e);
            e
        })?;

        Ok(rendered)
    }

    /// Translate and rewrite the items of `feed` in place.
    ///
    /// Items are handled one after another so their order never changes.
    /// Translation only runs when the host carries a target language; image
    /// rewriting runs whenever it is configured.
    pub async fn enrich(&self, feed: &mut Feed, host: &str, platform: &str) {
        let translation = self.translation.as_ref().and_then(|t| {
            target_language(host, &t.host_base).map(|lang| (&t.pipeline, lang))
        });

        if let Some((_, lang)) = &translation {
            tracing::info!("translate is enabled target={} host={}", lang, host);
        }

        if translation.is_none() && self.images.is_none() {
            return;
        }

        tracing::debug!("start translate & image proxy");
        for item in feed.items.iter_mut() {
            if let Some((pipeline, lang)) = &translation {
                pipeline.translate_item(item, lang, platform).await;
            }
            if let Some(rewriter) = &self.images {
                rewriter.rewrite_item(item, host, platform);
            }
        }
    }
}
