//! LibreTranslate Provider
//!
//! Translation through a LibreTranslate HTTP API, plus the factory that
//! picks a provider implementation from its configured identifier.

use crate::domain::errors::TranslateError;
use crate::domain::ports::TranslationProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Identifier of the LibreTranslate provider in the configuration.
pub const LIBRETRANSLATE: &str = "libretranslate";

/// Failure to set up a translation provider.
#[derive(Debug, Error)]
pub enum ProviderSetupError {
    #[error("unsupported translation provider: {0}")]
    Unsupported(String),

    #[error("{provider} settings parse error: {source}")]
    Settings {
        provider: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0} settings: api url is empty")]
    MissingUrl(&'static str),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct LibreTranslateSettings {
    api: LibreTranslateApi,
}

#[derive(Debug, Deserialize)]
struct LibreTranslateApi {
    url: String,
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// LibreTranslate-backed `TranslationProvider`.
pub struct LibreTranslateProvider {
    client: reqwest::Client,
    url: String,
    key: Option<String>,
}

impl LibreTranslateProvider {
    pub fn new(url: impl Into<String>, key: Option<String>) -> Result<Self, ProviderSetupError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            url: url.into(),
            key,
        })
    }

    /// Build from the YAML settings blob (`api.url`, optional `api.key`).
    pub fn from_settings(settings: &str) -> Result<Self, ProviderSetupError> {
        let cfg: LibreTranslateSettings =
            serde_yaml::from_str(settings).map_err(|source| ProviderSetupError::Settings {
                provider: LIBRETRANSLATE,
                source,
            })?;
        if cfg.api.url.is_empty() {
            return Err(ProviderSetupError::MissingUrl(LIBRETRANSLATE));
        }
        Self::new(cfg.api.url, cfg.api.key)
    }
}

#[async_trait]
impl TranslationProvider for LibreTranslateProvider {
    async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        is_html: bool,
    ) -> Result<String, TranslateError> {
        let body = TranslateRequest {
            q: text,
            source: "auto",
            target: target_lang,
            format: is_html.then_some("html"),
            api_key: self.key.as_deref(),
        };
        tracing::debug!("translate request target={} html={}", target_lang, is_html);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslateError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslateError::Status(response.status().as_u16()));
        }

        let decoded: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::Decode(e.to_string()))?;

        Ok(decoded.translated_text)
    }
}

/// Create the provider named by `provider` from its settings blob.
///
/// Unknown identifiers are rejected so a bad configuration fails at startup.
pub fn build_translation_provider(
    provider: &str,
    settings: &str,
) -> Result<Arc<dyn TranslationProvider>, ProviderSetupError> {
    match provider {
        LIBRETRANSLATE => Ok(Arc::new(LibreTranslateProvider::from_settings(settings)?)),
        other => Err(ProviderSetupError::Unsupported(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ===== Factory Tests =====

    #[test]
    fn test_build_libretranslate() {
        let settings = "api:\n  url: http://localhost:5000/translate\n  key: secret\n";
        assert!(build_translation_provider("libretranslate", settings).is_ok());
    }

    #[test]
    fn test_build_unknown_provider() {
        let result = build_translation_provider("deepl", "");
        assert!(matches!(result, Err(ProviderSetupError::Unsupported(p)) if p == "deepl"));
    }

    #[test]
    fn test_build_malformed_settings() {
        let result = build_translation_provider("libretranslate", "api: [not, a, map]");
        assert!(matches!(result, Err(ProviderSetupError::Settings { .. })));
    }

    #[test]
    fn test_build_missing_url() {
        let result = build_translation_provider("libretranslate", "api:\n  url: \"\"\n");
        assert!(matches!(result, Err(ProviderSetupError::MissingUrl(_))));
    }

    // ===== Translate Tests =====

    #[tokio::test]
    async fn test_translate_html_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_json(serde_json::json!({
                "q": "<p>Hello</p>",
                "source": "auto",
                "target": "fr",
                "format": "html",
                "api_key": "secret"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"translatedText": "<p>Bonjour</p>"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = LibreTranslateProvider::new(
            format!("{}/translate", server.uri()),
            Some("secret".to_string()),
        )
        .unwrap();

        let out = provider.translate("<p>Hello</p>", "fr", true).await.unwrap();
        assert_eq!(out, "<p>Bonjour</p>");
    }

    #[tokio::test]
    async fn test_translate_plain_without_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({
                "q": "Hello",
                "source": "auto",
                "target": "de"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"translatedText": "Hallo"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = LibreTranslateProvider::new(server.uri(), None).unwrap();
        assert_eq!(provider.translate("Hello", "de", false).await.unwrap(), "Hallo");
    }

    #[tokio::test]
    async fn test_translate_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "bad"})))
            .mount(&server)
            .await;

        let provider = LibreTranslateProvider::new(server.uri(), None).unwrap();
        let result = provider.translate("Hello", "xx", false).await;
        assert!(matches!(result, Err(TranslateError::Status(400))));
    }

    #[tokio::test]
    async fn test_translate_undecodable_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("nope"))
            .mount(&server)
            .await;

        let provider = LibreTranslateProvider::new(server.uri(), None).unwrap();
        let result = provider.translate("Hello", "de", false).await;
        assert!(matches!(result, Err(TranslateError::Decode(_))));
    }
}
