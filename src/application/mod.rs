//! Application Layer
//!
//! Use cases driven by the inbound adapters.

pub mod feed_service;
pub mod image_relay;
pub mod renderer;

pub use feed_service::{FeedService, HostTranslation, ServeError};
pub use image_relay::{ImageRelay, RelayError, RelayResponse, RelayRule};
pub use renderer::{render, RenderError, RenderedFeed};
