//! Language detection and translation clients.

use crate::config::TranslationConfig;
use async_trait::async_trait;
use std::time::Duration;
use syncpro_core::{SyncproError, SyncproResult};
use tracing::debug;

/// Detects the language of a piece of text.
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    /// Returns a short language code such as `en` or `fr`.
    async fn detect(&self, text: &str) -> SyncproResult<String>;
}

/// Translates text into a target language.
#[async_trait]
pub trait Translator: Send + Sync {
    /// May return an empty string when the service produced nothing.
    async fn translate(&self, text: &str, target_language: &str) -> SyncproResult<String>;
}

/// Client for the public Google Translate web endpoint.
///
/// One request serves both purposes: the reply carries the translated
/// segments and the detected source language.
pub struct GoogleTranslateClient {
    base_url: String,
    http: reqwest::Client,
}

impl GoogleTranslateClient {
    pub fn new(config: &TranslationConfig) -> SyncproResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncproError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.base_url().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn query(&self, text: &str, target_language: &str) -> SyncproResult<serde_json::Value> {
        let url = format!("{}/translate_a/single", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_language),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| SyncproError::Translation(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncproError::Translation(format!(
                "translate service returned {status}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| SyncproError::Translation(format!("malformed translate response: {e}")))
    }
}

/// Pulls the detected source language out of a translate reply.
pub fn detected_language(body: &serde_json::Value) -> Option<String> {
    body.get(2)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

/// Joins the translated segments of a translate reply.
pub fn translated_text(body: &serde_json::Value) -> String {
    body.get(0)
        .and_then(serde_json::Value::as_array)
        .map(|segments| {
            segments
                .iter()
                .filter_map(|seg| seg.get(0).and_then(serde_json::Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl LanguageDetector for GoogleTranslateClient {
    async fn detect(&self, text: &str) -> SyncproResult<String> {
        let body = self.query(text, "en").await?;
        let lang = detected_language(&body)
            .ok_or_else(|| SyncproError::Translation("no language in response".into()))?;
        debug!(language = %lang, "Language detected");
        Ok(lang)
    }
}

#[async_trait]
impl Translator for GoogleTranslateClient {
    async fn translate(&self, text: &str, target_language: &str) -> SyncproResult<String> {
        let body = self.query(text, target_language).await?;
        Ok(translated_text(&body))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleTranslateClient {
        GoogleTranslateClient::new(&TranslationConfig {
            api_base_url: Some(server.uri()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn parse_reply() {
        let body = serde_json::json!([
            [["Hello. ", "Bonjour. ", null, null, 10], ["How are you?", "Comment ça va ?", null, null, 10]],
            null,
            "fr"
        ]);
        assert_eq!(detected_language(&body).as_deref(), Some("fr"));
        assert_eq!(translated_text(&body), "Hello. How are you?");
    }

    #[test]
    fn parse_empty_reply() {
        let body = serde_json::json!([null, null, ""]);
        assert_eq!(detected_language(&body), None);
        assert_eq!(translated_text(&body), "");
    }

    #[tokio::test]
    async fn detect_reads_source_language() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("sl", "auto"))
            .and(query_param("q", "Bonjour"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([[["Hello", "Bonjour", null, null, 10]], null, "fr"])),
            )
            .mount(&server)
            .await;

        assert_eq!(client(&server).detect("Bonjour").await.unwrap(), "fr");
    }

    #[tokio::test]
    async fn translate_targets_language() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("tl", "fr"))
            .and(query_param("q", "Hi there!"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([[["Salut!", "Hi there!", null, null, 3]], null, "en"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(
            client(&server).translate("Hi there!", "fr").await.unwrap(),
            "Salut!"
        );
    }

    #[tokio::test]
    async fn service_error_is_translation_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client(&server).translate("Hallo", "en").await.unwrap_err();
        assert!(matches!(err, SyncproError::Translation(_)));
        let err = client(&server).detect("Hallo").await.unwrap_err();
        assert!(matches!(err, SyncproError::Translation(_)));
    }
}
