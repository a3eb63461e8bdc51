//! Adapters Layer
//!
//! Inbound adapters drive the application (HTTP server); outbound adapters
//! implement the domain ports (backend fetcher, translation provider,
//! translation cache).

pub mod inbound;
pub mod outbound;
