//! GeminiApiAgent - Direct REST API implementation for Gemini.
//!
//! Sends one `generateContent` call per [`GenerationRequest`] with a JSON
//! response schema and returns the raw response text. Parsing and validation
//! of that text happen in the gateways.

use std::time::Duration;

use async_trait::async_trait;
use forge_core::ForgeError;
use forge_core::config::GeminiSettings;
use forge_core::error::Result;
use forge_core::generator::{ContentGenerator, GenerationRequest, ReasoningMode};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// [`ContentGenerator`] that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiAgent {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiApiAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiApiAgent")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiApiAgent {
    /// Creates an agent whose requests give up after `timeout`.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ForgeError::internal(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            timeout,
        })
    }

    pub fn from_settings(api_key: impl Into<String>, settings: &GeminiSettings) -> Result<Self> {
        let agent = Self::new(api_key, Duration::from_secs(settings.timeout_secs))?;
        Ok(match &settings.base_url {
            Some(url) => agent.with_base_url(url),
            None => agent,
        })
    }

    /// Points the agent at another `.../models` endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn send_request(&self, model: &str, body: &GenerateContentRequest) -> Result<String> {
        let url = format!("{}/{model}:generateContent", self.base_url);

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                ForgeError::Timeout(self.timeout)
            } else {
                ForgeError::malformed_output(format!("Failed to parse Gemini response: {err}"))
            }
        })?;

        extract_text_response(parsed)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ForgeError {
        if err.is_timeout() {
            ForgeError::Timeout(self.timeout)
        } else if err.is_connect() {
            ForgeError::network(format!("Could not reach the Gemini API: {err}"))
        } else {
            ForgeError::network(format!("Gemini API request failed: {err}"))
        }
    }
}

#[async_trait]
impl ContentGenerator for GeminiApiAgent {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let body = build_request_body(&request);
        tracing::debug!(
            "Gemini request: model={}, text_chars={}, image={}",
            request.model,
            request.text.chars().count(),
            request.image.is_some()
        );
        self.send_request(&request.model, &body).await
    }
}

fn build_request_body(request: &GenerationRequest) -> GenerateContentRequest {
    let mut parts = Vec::new();
    if let Some(image) = &request.image {
        parts.push(Part::InlineData {
            inline_data: InlineDataPayload {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        });
    }
    parts.push(Part::Text {
        text: request.text.clone(),
    });

    let (temperature, thinking_config) = match request.reasoning {
        Some(ReasoningMode::Temperature(value)) => (Some(value), None),
        Some(ReasoningMode::Thinking { budget }) => (
            None,
            Some(ThinkingConfig {
                thinking_budget: budget,
            }),
        ),
        None => (None, None),
    };

    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part::Text {
                text: request.system_instruction.clone(),
            }],
        },
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: request.response_schema.clone(),
            temperature,
            thinking_config,
        },
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Joins the answer parts of the first candidate, skipping reasoning parts.
fn extract_text_response(response: GenerateContentResponse) -> Result<String> {
    let parts = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .ok_or(ForgeError::EmptyResponse)?;

    let text: String = parts
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        return Err(ForgeError::EmptyResponse);
    }
    Ok(text)
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> ForgeError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ForgeError::credential(message),
        StatusCode::BAD_REQUEST if mentions_api_key(&message) => ForgeError::credential(message),
        StatusCode::TOO_MANY_REQUESTS => ForgeError::rate_limited(message, retry_after),
        _ => ForgeError::Api {
            status: status.as_u16(),
            message,
            is_retryable: matches!(
                status,
                StatusCode::INTERNAL_SERVER_ERROR
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
        },
    }
}

fn mentions_api_key(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("api key") || lower.contains("api_key")
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
