mod http_feed_fetcher;
mod libretranslate_provider;
mod memory_translation_cache;
mod redis_translation_cache;

pub use http_feed_fetcher::HttpFeedFetcher;
pub use libretranslate_provider::{
    build_translation_provider, LibreTranslateProvider, ProviderSetupError, LIBRETRANSLATE,
};
pub use memory_translation_cache::MemoryTranslationCache;
pub use redis_translation_cache::RedisTranslationCache;
