//! Domain Services
//!
//! Business logic that doesn't belong to a single entity.

mod image_rewriter;
mod load_balancer;
mod translation_pipeline;

pub use image_rewriter::ImageRewriter;
pub use load_balancer::LoadBalancer;
pub use translation_pipeline::TranslationPipeline;
