//! Translation Provider Port
//!
//! Defines the interface to an external machine translation service.

use crate::domain::errors::TranslateError;
use async_trait::async_trait;

/// External machine translation backend.
///
/// The source language is always auto-detected. When `is_html` is set the
/// provider must keep the markup structure intact and translate only text.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        is_html: bool,
    ) -> Result<String, TranslateError>;
}
