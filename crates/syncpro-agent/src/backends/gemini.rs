use super::{status_error, timeout_error, GenerationBackend};
use crate::config::GenerationConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use syncpro_core::{SyncproError, SyncproResult};
use tracing::debug;

/// Google Generative Language API backend (Gemini and Gemma models).
pub struct GeminiBackend {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, config: &GenerationConfig) -> SyncproResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncproError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, model_id: &str) -> String {
        // Catalog ids already carry the `models/` prefix.
        let model = if model_id.starts_with("models/") {
            model_id.to_string()
        } else {
            format!("models/{model_id}")
        };
        format!("{}/v1beta/{model}:generateContent", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    code: Option<u16>,
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(&self, model_id: &str, prompt: &str) -> SyncproResult<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(self.url(model_id))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let detail = serde_json::from_str::<GenerateResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(status_error(
                status.as_u16(),
                format!("Gemini API error {status}: {detail}"),
            ));
        }

        parse_generate_response(&text)
    }
}

fn transport_error(e: reqwest::Error) -> SyncproError {
    if e.is_timeout() {
        timeout_error(e)
    } else {
        SyncproError::Generation(e.to_string())
    }
}

/// Extracts the answer text: every text part of the first candidate, joined.
/// A reply with no candidates yields an empty answer.
pub fn parse_generate_response(body: &str) -> SyncproResult<String> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| SyncproError::Generation(format!("malformed Gemini response: {e}")))?;

    if let Some(err) = parsed.error {
        let message = format!("Gemini API error: {}", err.message);
        return Err(match err.code {
            Some(code) => status_error(code, message),
            None => SyncproError::Generation(message),
        });
    }

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    debug!(chars = text.len(), "Gemini response parsed");
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backends::{error_status, is_timeout};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> GeminiBackend {
        let config = GenerationConfig {
            api_base_url: Some(server.uri()),
            timeout_secs: 5,
            ..GenerationConfig::default()
        };
        GeminiBackend::new("test-key", &config).unwrap()
    }

    #[test]
    fn parse_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hi "},{"text":"there!"}],"role":"model"}}]}"#;
        assert_eq!(parse_generate_response(body).unwrap(), "Hi there!");
    }

    #[test]
    fn parse_without_candidates_is_empty() {
        assert_eq!(parse_generate_response(r#"{"candidates":[]}"#).unwrap(), "");
        assert_eq!(parse_generate_response("{}").unwrap(), "");
    }

    #[test]
    fn parse_error_object() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = parse_generate_response(body).unwrap_err();
        assert_eq!(error_status(&err), Some(429));
    }

    #[test]
    fn url_adds_models_prefix_once() {
        let config = GenerationConfig {
            api_base_url: Some("http://localhost:9/".into()),
            ..GenerationConfig::default()
        };
        let b = GeminiBackend::new("k", &config).unwrap();
        assert_eq!(
            b.url("models/gemini-1.5-flash"),
            "http://localhost:9/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
            b.url("gemma-3-12b-it"),
            "http://localhost:9/v1beta/models/gemma-3-12b-it:generateContent"
        );
    }

    #[tokio::test]
    async fn generate_sends_key_and_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Hello"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Hi there!"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = backend(&server)
            .generate("models/gemini-1.5-flash", "Hello")
            .await
            .unwrap();
        assert_eq!(answer, "Hi there!");
    }

    #[tokio::test]
    async fn invalid_key_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .generate("models/gemini-1.5-pro", "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncproError::Generation(_)));
        let msg = err.to_string();
        assert!(msg.contains("400"), "got: {msg}");
        assert!(msg.contains("API key not valid"), "got: {msg}");
        assert_eq!(error_status(&err), Some(400));
    }

    #[tokio::test]
    async fn server_error_status_ignores_body_digits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503).set_body_string("backend overloaded (trace 404a1)"),
            )
            .mount(&server)
            .await;

        let err = backend(&server)
            .generate("models/gemini-1.5-flash", "Hello")
            .await
            .unwrap_err();
        assert_eq!(error_status(&err), Some(503));
        assert!(err.to_string().contains("404a1"));
    }

    #[tokio::test]
    async fn slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = GenerationConfig {
            api_base_url: Some(server.uri()),
            timeout_secs: 1,
            ..GenerationConfig::default()
        };
        let err = GeminiBackend::new("test-key", &config)
            .unwrap()
            .generate("models/gemini-1.5-flash", "Hello")
            .await
            .unwrap_err();
        assert!(is_timeout(&err), "got: {err}");
    }
}
