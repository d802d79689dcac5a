// ABOUTME: OpenAI chat-completions provider implementing the LlmProvider contract
// ABOUTME: Handles request encoding, streaming SSE decode, and upstream error mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! # `OpenAI` Provider
//!
//! Talks to the `OpenAI` chat completions API, or any endpoint that speaks
//! the same protocol (Azure `OpenAI`, local inference servers). Base URL,
//! API key, default model, and timeouts come from
//! [`OpenAiConfig`](crate::config::environment::OpenAiConfig); nothing is
//! read from the process environment here.
//!
//! Streaming responses are decoded through [`super::sse`], which owns the
//! SSE line framing. This module only supplies the payload parser that turns
//! one JSON event into a [`StreamChunk`].
//!
//! Upstream rejections of any status surface as external-service errors;
//! this boundary never forwards the upstream's own status code to clients.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::sse::decode_sse_stream;
use super::{
    ChatMessage, ChatRequest, ChatResponse, ChatStream, LlmProvider, StreamChunk, TokenUsage,
};
use crate::config::environment::OpenAiConfig;
use crate::errors::AppError;

/// Provider name used in error messages and logs
const PROVIDER_NAME: &str = "OpenAI";

// ============================================================================
// API Request/Response Types (OpenAI wire format)
// ============================================================================

/// Chat completions request body
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Message structure on the wire
#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for ApiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        }
    }
}

/// Non-streaming completion response
#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    model: String,
}

/// Choice in a non-streaming response
#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    finish_reason: Option<String>,
}

/// Message in a non-streaming response
#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

/// Usage statistics in a response
#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<ApiUsage> for TokenUsage {
    fn from(usage: ApiUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// One event payload of a streaming response
#[derive(Debug, Deserialize)]
struct ApiStreamChunk {
    choices: Vec<ApiStreamChoice>,
}

/// Choice in a streaming event
#[derive(Debug, Deserialize)]
struct ApiStreamChoice {
    #[serde(default)]
    delta: ApiDelta,
    finish_reason: Option<String>,
}

/// Delta content in a streaming event
#[derive(Debug, Default, Deserialize)]
struct ApiDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Error response body
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail structure
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// `OpenAI` chat-completions provider
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a new provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    /// Add the authorization header if an API key is configured
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("Bearer {api_key}"))
        } else {
            request
        }
    }

    /// Build the wire request from an internal request
    fn build_request(&self, request: &ChatRequest, stream: bool) -> ApiRequest {
        ApiRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.default_model.clone()),
            messages: request.messages.iter().map(ApiMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: stream.then_some(true),
        }
    }

    /// Map a transport-level request failure
    fn request_error(e: &reqwest::Error, base_url: &str) -> AppError {
        if e.is_connect() {
            AppError::external_service(PROVIDER_NAME, format!("Cannot connect to {base_url}: {e}"))
        } else if e.is_timeout() {
            AppError::external_service(PROVIDER_NAME, format!("Request timed out: {e}"))
        } else {
            AppError::external_service(PROVIDER_NAME, format!("Request failed: {e}"))
        }
    }

    /// Map a non-success upstream status into an error
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> AppError {
        if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(body) {
            let error_type = parsed
                .error
                .error_type
                .unwrap_or_else(|| "unknown".to_owned());
            AppError::external_service(
                PROVIDER_NAME,
                format!("{error_type} ({status}): {}", parsed.error.message),
            )
        } else {
            AppError::external_service(
                PROVIDER_NAME,
                format!(
                    "API error ({status}): {}",
                    body.chars().take(200).collect::<String>()
                ),
            )
        }
    }
}

/// Parse one streaming event payload into a chunk
///
/// Returns `None` for payloads that yield no chunk: malformed JSON, an empty
/// choice list, or a delta carrying neither content nor a finish reason.
/// Malformed payloads are skipped silently (logged at debug).
fn parse_stream_payload(payload: &str) -> Option<Result<StreamChunk, AppError>> {
    let chunk: ApiStreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!("Skipping malformed stream payload: {e}");
            return None;
        }
    };

    let choice = chunk.choices.into_iter().next()?;
    if choice.delta.content.is_none() && choice.finish_reason.is_none() {
        return None;
    }

    Some(Ok(StreamChunk {
        delta: choice.delta.content.unwrap_or_default(),
        is_final: choice.finish_reason.is_some(),
        finish_reason: choice.finish_reason,
    }))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.config.default_model)))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let api_request = self.build_request(request, false);

        let response = self
            .authorize(
                self.client
                    .post(self.api_url("chat/completions"))
                    .json(&api_request),
            )
            .send()
            .await
            .map_err(|e| Self::request_error(&e, &self.config.base_url))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::external_service(PROVIDER_NAME, format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            return Err(Self::parse_error_response(status, &body));
        }

        let api_response: ApiResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse chat completion response: {e}");
            AppError::external_service(PROVIDER_NAME, format!("Failed to parse response: {e}"))
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::external_service(PROVIDER_NAME, "API returned no choices"))?;

        let content = choice.message.content.unwrap_or_default();

        debug!(
            "Received completion: {} chars, finish_reason: {:?}",
            content.len(),
            choice.finish_reason
        );

        Ok(ChatResponse {
            content,
            model: api_response.model,
            usage: api_response.usage.map(Into::into),
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model.as_deref().unwrap_or(&self.config.default_model)))]
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        let api_request = self.build_request(request, true);

        let response = self
            .authorize(
                self.client
                    .post(self.api_url("chat/completions"))
                    .json(&api_request),
            )
            .send()
            .await
            .map_err(|e| Self::request_error(&e, &self.config.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error_response(status, &body));
        }

        Ok(decode_sse_stream(
            response.bytes_stream(),
            parse_stream_payload,
            PROVIDER_NAME,
        ))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, AppError> {
        let response = self
            .authorize(self.client.get(self.api_url("models")))
            .send()
            .await
            .map_err(|e| Self::request_error(&e, &self.config.base_url))?;

        let healthy = response.status().is_success();
        if !healthy {
            warn!(
                "Upstream health check failed with status: {}",
                response.status()
            );
        }

        Ok(healthy)
    }
}
