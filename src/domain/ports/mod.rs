mod feed_fetcher;
mod translation_cache;
mod translation_provider;

pub use feed_fetcher::FeedFetcher;
pub use translation_cache::TranslationCache;
pub use translation_provider::TranslationProvider;
