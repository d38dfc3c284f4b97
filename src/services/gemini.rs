//! Wire types and transport for the `generateContent` endpoint.

use crate::config::Config;
use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Request types

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

impl GenerateContentRequest {
    /// A single-turn conversation holding one user message, optionally
    /// asking for JSON that matches `schema`.
    pub fn single_turn(prompt: &str, schema: Option<&Value>) -> Self {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: schema.map(|schema| GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema.clone(),
            }),
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        self.contents
            .first()
            .and_then(|content| content.parts.first())
            .map(|part| part.text.as_str())
    }
}

// Response types

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ReplyPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyPart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn reply_text(&self) -> Result<&str, GatewayError> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.as_deref())
            .ok_or(GatewayError::EmptyReply)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Something that can carry one `generateContent` round trip.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError>;
}

pub struct GeminiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(GeminiBackend {
            client,
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ContentBackend for GeminiBackend {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        tracing::debug!(
            "POST {} ({} prompt characters, structured: {})",
            self.endpoint,
            request.prompt().map_or(0, |prompt| prompt.chars().count()),
            request.generation_config.is_some()
        );

        let mut request_builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request);

        if !self.api_key.is_empty() {
            request_builder = request_builder.query(&[("key", self.api_key.as_str())]);
        }

        let response = request_builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&error_text) {
                Ok(error_response) => error_response.error.message,
                Err(_) => error_text,
            };
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text)
            .map_err(|e| GatewayError::MalformedEnvelope(e.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_request_has_no_generation_config() {
        let request = GenerateContentRequest::single_turn("Summarize this", None);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "contents": [{ "role": "user", "parts": [{ "text": "Summarize this" }] }] })
        );
    }

    #[test]
    fn test_schema_request_asks_for_json() {
        let schema = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
        let request = GenerateContentRequest::single_turn("Quiz me", Some(&schema));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"], schema);
        assert_eq!(request.prompt(), Some("Quiz me"));
    }

    #[test]
    fn test_reply_text_reads_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": "first" }, { "text": "second" }] } },
                { "content": { "parts": [{ "text": "other" }] } }
            ],
            "usageMetadata": { "totalTokenCount": 12 }
        }))
        .unwrap();
        assert_eq!(response.reply_text(), Ok("first"));
    }

    #[test]
    fn test_reply_text_missing_fields_is_empty_reply() {
        for body in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "inlineData": {} }] } }] }),
        ] {
            let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
            assert_eq!(response.reply_text(), Err(GatewayError::EmptyReply));
        }
    }

    /// Serve `router` on an ephemeral local port and point a backend at it.
    async fn backend_for(router: axum::Router) -> GeminiBackend {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let base = format!("http://{}/v1beta", addr);
        let config = Config::from_lookup(|key| match key {
            "GEMINI_API_BASE" => Some(base.clone()),
            "GEMINI_API_KEY" => Some("test-key".to_string()),
            _ => None,
        })
        .unwrap();
        GeminiBackend::new(&config).unwrap()
    }

    fn replying_with(
        status: axum::http::StatusCode,
        body: &'static str,
    ) -> axum::Router {
        axum::Router::new().fallback(move || async move { (status, body) })
    }

    #[tokio::test]
    async fn test_error_status_carries_api_message() {
        let backend = backend_for(replying_with(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error":{"code":503,"message":"overloaded","status":"UNAVAILABLE"}}"#,
        ))
        .await;

        let result = backend
            .generate_content(GenerateContentRequest::single_turn("hi", None))
            .await;

        assert_eq!(
            result.unwrap_err(),
            GatewayError::Status {
                status: 503,
                message: "overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_error_status_without_json_keeps_raw_body() {
        let backend = backend_for(replying_with(
            axum::http::StatusCode::BAD_GATEWAY,
            "upstream down",
        ))
        .await;

        let result = backend
            .generate_content(GenerateContentRequest::single_turn("hi", None))
            .await;

        assert_eq!(
            result.unwrap_err(),
            GatewayError::Status {
                status: 502,
                message: "upstream down".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_malformed_envelope() {
        let backend = backend_for(replying_with(axum::http::StatusCode::OK, "not json")).await;

        let result = backend
            .generate_content(GenerateContentRequest::single_turn("hi", None))
            .await;

        assert!(matches!(result, Err(GatewayError::MalformedEnvelope(_))));
    }

    #[tokio::test]
    async fn test_success_body_is_parsed() {
        let backend = backend_for(replying_with(
            axum::http::StatusCode::OK,
            r#"{"candidates":[{"content":{"parts":[{"text":"hello back"}]}}]}"#,
        ))
        .await;

        let response = backend
            .generate_content(GenerateContentRequest::single_turn("hi", None))
            .await
            .unwrap();

        assert_eq!(response.reply_text(), Ok("hello back"));
    }
}
