//! feed-relay - Smart layer in front of a pool of RSSHub instances
//!
//! This is the composition root that wires together all the components.

use feed_relay::adapters::outbound::{
    build_translation_provider, HttpFeedFetcher, MemoryTranslationCache, RedisTranslationCache,
};
use feed_relay::application::{FeedService, HostTranslation, ImageRelay};
use feed_relay::config::load_config;
use feed_relay::domain::ports::TranslationCache;
use feed_relay::domain::services::{ImageRewriter, LoadBalancer, TranslationPipeline};
use feed_relay::infrastructure::{CircuitBreaker, CircuitBreakerConfig};
use feed_relay::HttpServer;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration file
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.system.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    tracing::info!(
        "starting feed-relay listen={} instances={}",
        cfg.system.listen,
        cfg.rsshub.len()
    );

    // ===== COMPOSITION ROOT =====

    // 1. Backend pool
    let fetcher = Arc::new(HttpFeedFetcher::new(cfg.system.request_timeout)?);
    let balancer = Arc::new(LoadBalancer::new(
        cfg.instances(),
        fetcher,
        cfg.system.request_timeout,
    ));

    let mut feeds = FeedService::new(balancer);

    // 2. Translation (optional)
    if let Some(translate) = &cfg.translate {
        let provider = build_translation_provider(&translate.provider, &translate.settings)?;

        let cache: Arc<dyn TranslationCache> = match cfg.system.redis.url() {
            Some(url) => {
                tracing::info!("translation cache: redis");
                Arc::new(RedisTranslationCache::new(url)?.with_timeout(cfg.system.redis.timeout))
            }
            None => {
                tracing::info!("translation cache: in-memory");
                let cache = MemoryTranslationCache::new();
                cache.start_cleanup_task(Duration::from_secs(60));
                Arc::new(cache)
            }
        };

        let pipeline = TranslationPipeline::new(
            provider,
            cache,
            Arc::new(CircuitBreaker::new(
                "translation cache",
                CircuitBreakerConfig::default(),
            )),
            cfg.system.redis.prefix.clone(),
            cfg.system.redis.cache_expire,
        );

        tracing::info!(
            "translation enabled provider={} host_base={}",
            translate.provider,
            translate.host_base
        );
        feeds = feeds.with_translation(HostTranslation::new(pipeline, translate.host_base.clone()));
    }

    // 3. Image proxy (optional)
    let mut relay = None;
    if let Some(proxy) = &cfg.image_proxy {
        tracing::info!("image proxy enabled path={} rules={}", proxy.path, proxy.rules.len());
        feeds = feeds.with_image_rewriter(ImageRewriter::new(proxy.path.clone()));
        relay = Some((proxy.path.clone(), Arc::new(ImageRelay::new(proxy.rules.clone()))));
    }

    // 4. Inbound HTTP server
    let mut server = HttpServer::new(cfg.system.listen.clone(), Arc::new(feeds));
    if let Some((path, relay)) = relay {
        server = server.with_image_relay(path, relay);
    }

    server.run().await
}
