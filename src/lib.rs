//! feed-relay Library
//!
//! This module exposes the feed-relay components for use in integration
//! tests and as a library.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use adapters::inbound::HttpServer;
pub use application::{FeedService, HostTranslation, ImageRelay};
pub use config::{load_config, parse_config, Config};
pub use domain::entities::{Feed, Instance, Item};
pub use domain::errors::FetchError;
pub use domain::ports::{FeedFetcher, TranslationCache, TranslationProvider};
pub use domain::services::{ImageRewriter, LoadBalancer, TranslationPipeline};
pub use domain::value_objects::{target_language, OutputFormat};
