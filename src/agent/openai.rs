//! OpenAI-compatible chat completion client.
//!
//! Only the non-streaming `/v1/chat/completions` endpoint is used. The
//! request carries `messages[]`, `temperature` and, for structured edits,
//! `response_format: {"type": "json_object"}`; the reply text is read from
//! `choices[0].message.content`.

use super::message::ChatMessage;
use crate::config::LlmConfig;
use crate::error::{CandidateError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Ask the provider to return a single JSON object.
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>, temperature: f32) -> Self {
        Self {
            messages,
            temperature,
            json_mode: false,
        }
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

/// Chat completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the assistant message content for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Connection settings for [`OpenAiClient`].
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key. `None` makes every call fail with [`CandidateError::MissingApiKey`].
    pub api_key: Option<String>,
    /// Base URL without the `/v1` suffix.
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()).filter(|k| !k.trim().is_empty()),
            base_url: "https://api.openai.com".into(),
            model: model.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Builds a config from the `[llm]` section, resolving the key from the environment if needed.
    pub fn from_llm_config(llm: &LlmConfig) -> Self {
        Self {
            api_key: llm.resolve_api_key(),
            base_url: normalize_base_url(&llm.api_url),
            model: llm.api_model.clone(),
            timeout: Duration::from_secs(llm.request_timeout_secs),
        }
    }

    /// Set a custom base URL. A trailing `/v1` or `/` is stripped.
    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(url.as_ref());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/v1")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_owned()
}

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

/// [`CompletionClient`] over HTTP using `reqwest`.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl OpenAiClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`CandidateError::Config`] if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CandidateError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> CandidateError {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 => CandidateError::Auth(format!("OpenAI authentication failed: {message}")),
            429 => CandidateError::Request(format!("OpenAI rate limited: {message}")),
            _ => CandidateError::Provider(format!("OpenAI HTTP {}: {message}", status.as_u16())),
        }
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

fn extract_content(body: &serde_json::Value) -> Result<String> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(String::from)
        .ok_or_else(|| {
            CandidateError::InvalidResponse("missing choices[0].message.content".into())
        })
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(CandidateError::MissingApiKey)?;

        let body = RequestBody {
            model: &self.config.model,
            messages: &request.messages,
            temperature: request.temperature,
            response_format: request
                .json_mode
                .then(|| serde_json::json!({ "type": "json_object" })),
        };
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            json_mode = request.json_mode,
            "sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CandidateError::Request(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CandidateError::Request(format!("failed to read OpenAI response: {e}")))?;
        if !status.is_success() {
            return Err(Self::map_http_error(status, &text));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| CandidateError::InvalidResponse(format!("response is not JSON: {e}")))?;
        extract_content(&json)
    }
}
