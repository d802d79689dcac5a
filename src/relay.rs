// ABOUTME: Core relay orchestrating chat requests between HTTP clients and the LLM provider
// ABOUTME: Validates input, streams completions, persists transcripts, and fans out thread events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! # Chat Relay
//!
//! The relay sits between the HTTP routes and the [`LlmProvider`]. Every chat
//! operation follows the same lifecycle: validate the request before any
//! upstream work, then hand back a lazy stream the HTTP layer pulls chunk by
//! chunk. The provider connection opens on the first pull, and upstream
//! failures arrive as stream items. Nothing is buffered ahead of the client;
//! when the client disconnects the stream is dropped and the upstream
//! connection closes with it.
//!
//! Thread-scoped conversations ([`Relay::stream_chat`]) additionally persist
//! both sides of the exchange through [`TranscriptStore`] and publish
//! progress events on the [`ThreadNotificationBus`] so dashboard subscribers
//! can follow along without holding the generation stream themselves.

use std::sync::Arc;

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::config::environment::ChatDefaults;
use crate::database::TranscriptStore;
use crate::errors::{AppError, AppResult};
use crate::llm::{ChatMessage, ChatRequest, ChatResponse, ChatStream, LlmProvider};
use crate::models::{new_run_id, ConversationTurn};
use crate::sse::{ThreadEvent, ThreadNotificationBus};

// ============================================================================
// Request / Response Types
// ============================================================================

/// Inbound payload for the one-shot ask endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    /// User prompt forwarded verbatim as the user message
    pub prompt: String,
    /// Sampling temperature override (0.0-2.0)
    pub temperature: Option<f32>,
    /// Generation cap override
    pub max_tokens: Option<u32>,
    /// Whether the caller wants an SSE stream; defaults to streaming
    pub stream: Option<bool>,
}

impl AskRequest {
    /// Streaming is the default delivery mode unless explicitly disabled.
    #[must_use]
    pub fn wants_stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }
}

/// Result of a non-streaming completion.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    /// Full assistant text
    pub text: String,
    /// Total token count when the provider reports usage
    pub tokens_used: Option<u32>,
    /// Provider-reported stop cause, e.g. `stop` or `length`
    pub finish_reason: Option<String>,
}

impl From<ChatResponse> for AskOutcome {
    fn from(response: ChatResponse) -> Self {
        Self {
            text: response.content,
            tokens_used: response.usage.map(|usage| usage.total_tokens),
            finish_reason: response.finish_reason,
        }
    }
}

// ============================================================================
// Relay
// ============================================================================

/// Orchestrates chat traffic between HTTP handlers and the LLM provider.
#[derive(Clone)]
pub struct Relay {
    provider: Arc<dyn LlmProvider>,
    transcripts: TranscriptStore,
    bus: ThreadNotificationBus,
    defaults: ChatDefaults,
}

impl Relay {
    /// Creates a relay backed by the given provider, transcript store, and bus.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        transcripts: TranscriptStore,
        bus: ThreadNotificationBus,
        defaults: ChatDefaults,
    ) -> Self {
        Self {
            provider,
            transcripts,
            bus,
            defaults,
        }
    }

    /// Runs a one-shot completion and returns the full assistant reply.
    ///
    /// Validation happens before any provider call; a rejected request never
    /// opens an upstream connection.
    #[instrument(skip(self, request))]
    pub async fn ask_complete(&self, request: &AskRequest) -> AppResult<AskOutcome> {
        validate_ask(request)?;

        let chat_request = self.build_ask_request(request);
        let response = self.provider.complete(&chat_request).await?;

        info!(
            provider = self.provider.name(),
            chars = response.content.len(),
            "Completed non-streaming ask"
        );
        Ok(response.into())
    }

    /// Opens a streaming completion for a one-shot prompt.
    ///
    /// The returned stream yields deltas as the provider produces them. The
    /// upstream connection opens on the first pull; a connection failure
    /// arrives as the stream's single `Err` item. The caller owns the stream;
    /// dropping it aborts the upstream request.
    #[instrument(skip(self, request))]
    pub fn ask_streaming(&self, request: &AskRequest) -> AppResult<ChatStream> {
        validate_ask(request)?;

        let chat_request = self.build_ask_request(request).with_streaming();
        let provider = Arc::clone(&self.provider);

        let stream = async_stream::stream! {
            let mut upstream = match provider.complete_stream(&chat_request).await {
                Ok(upstream) => upstream,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            while let Some(result) = upstream.next().await {
                yield result;
            }
        };

        Ok(Box::pin(stream))
    }

    /// Streams an assistant reply for a thread-scoped message.
    ///
    /// The user turn is persisted before the upstream connection opens. Token
    /// deltas are published on the notification bus as they arrive, and the
    /// assembled assistant turn is persisted once the stream ends normally. A
    /// stream dropped mid-generation persists nothing for the assistant side.
    #[instrument(skip(self, message, assistant_id))]
    pub async fn stream_chat(
        &self,
        thread_id: &str,
        message: &str,
        assistant_id: Option<&str>,
    ) -> AppResult<ChatStream> {
        if message.trim().is_empty() {
            return Err(AppError::invalid_input("Message must not be empty"));
        }

        let run_id = new_run_id();
        let user_turn = ConversationTurn::user(thread_id, message).with_run_id(&run_id);
        self.transcripts.append(&user_turn).await?;

        let chat_request = ChatRequest::new(vec![
            ChatMessage::system(self.defaults.system_prompt.clone()),
            ChatMessage::user(message),
        ])
        .with_temperature(self.defaults.temperature)
        .with_max_tokens(self.defaults.max_tokens)
        .with_streaming();

        let provider = Arc::clone(&self.provider);
        let transcripts = self.transcripts.clone();
        let bus = self.bus.clone();
        let thread_id = thread_id.to_owned();
        let assistant_id = assistant_id.map(str::to_owned);

        let stream = async_stream::stream! {
            let mut upstream = match provider.complete_stream(&chat_request).await {
                Ok(upstream) => upstream,
                Err(e) => {
                    error!(thread_id = %thread_id, "Upstream connection failed: {e}");
                    bus.publish(
                        &thread_id,
                        ThreadEvent::new(
                            "error",
                            json!({
                                "threadId": thread_id,
                                "error": e.to_string(),
                            }),
                        ),
                    )
                    .await;
                    yield Err(e);
                    return;
                }
            };

            let mut full_response = String::new();

            while let Some(result) = upstream.next().await {
                match result {
                    Ok(chunk) => {
                        if !chunk.delta.is_empty() {
                            full_response.push_str(&chunk.delta);
                            bus.publish(
                                &thread_id,
                                ThreadEvent::new(
                                    "token",
                                    json!({
                                        "threadId": thread_id,
                                        "token": chunk.delta,
                                    }),
                                ),
                            )
                            .await;
                        }
                        yield Ok(chunk);
                    }
                    Err(e) => {
                        error!(thread_id = %thread_id, "Stream failed mid-generation: {e}");
                        bus.publish(
                            &thread_id,
                            ThreadEvent::new(
                                "error",
                                json!({
                                    "threadId": thread_id,
                                    "error": e.to_string(),
                                }),
                            ),
                        )
                        .await;
                        yield Err(e);
                        return;
                    }
                }
            }

            debug!(
                thread_id = %thread_id,
                chars = full_response.len(),
                "Stream complete, persisting assistant turn"
            );

            let mut assistant_turn =
                ConversationTurn::assistant(&thread_id, &full_response).with_run_id(&run_id);
            if let Some(id) = &assistant_id {
                assistant_turn = assistant_turn.with_assistant_id(id);
            }

            match transcripts.append(&assistant_turn).await {
                Ok(()) => {
                    bus.publish(
                        &thread_id,
                        ThreadEvent::new("completed", json!({ "threadId": thread_id })),
                    )
                    .await;
                }
                Err(e) => {
                    // The client already holds the full reply, so the stream
                    // stays intact; only the transcript write is reported.
                    error!(thread_id = %thread_id, "Failed to persist assistant turn: {e}");
                    bus.publish(
                        &thread_id,
                        ThreadEvent::new(
                            "error",
                            json!({
                                "threadId": thread_id,
                                "error": e.to_string(),
                            }),
                        ),
                    )
                    .await;
                    yield Err(e);
                }
            }
        };

        Ok(Box::pin(stream))
    }

    /// Reports whether the upstream provider is reachable.
    ///
    /// Probe failures are reported as `false`, never as an error.
    pub async fn check_connection(&self) -> bool {
        matches!(self.provider.health_check().await, Ok(true))
    }

    fn build_ask_request(&self, request: &AskRequest) -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user(request.prompt.clone())])
            .with_temperature(request.temperature.unwrap_or(self.defaults.temperature))
            .with_max_tokens(request.max_tokens.unwrap_or(self.defaults.max_tokens))
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

/// Rejects malformed ask parameters before any upstream work happens.
fn validate_ask(request: &AskRequest) -> AppResult<()> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::invalid_input("Prompt must not be empty"));
    }
    if let Some(temperature) = request.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::invalid_input(format!(
                "Temperature must be between 0.0 and 2.0, got {temperature}"
            )));
        }
    }
    if let Some(max_tokens) = request.max_tokens {
        if max_tokens == 0 {
            return Err(AppError::invalid_input(
                "maxTokens must be greater than zero",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(prompt: &str) -> AskRequest {
        AskRequest {
            prompt: prompt.to_owned(),
            temperature: None,
            max_tokens: None,
            stream: None,
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate_ask(&ask("Hello")).is_ok());
    }

    #[test]
    fn validate_rejects_empty_prompt() {
        assert!(validate_ask(&ask("")).is_err());
        assert!(validate_ask(&ask("   \n\t")).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        let mut request = ask("Hello");
        request.temperature = Some(2.5);
        assert!(validate_ask(&request).is_err());

        request.temperature = Some(-0.1);
        assert!(validate_ask(&request).is_err());

        request.temperature = Some(0.0);
        assert!(validate_ask(&request).is_ok());
        request.temperature = Some(2.0);
        assert!(validate_ask(&request).is_ok());
    }

    #[test]
    fn validate_rejects_zero_max_tokens() {
        let mut request = ask("Hello");
        request.max_tokens = Some(0);
        assert!(validate_ask(&request).is_err());

        request.max_tokens = Some(1);
        assert!(validate_ask(&request).is_ok());
    }

    #[test]
    fn streaming_is_the_default_mode() {
        assert!(ask("Hello").wants_stream());

        let mut request = ask("Hello");
        request.stream = Some(false);
        assert!(!request.wants_stream());
    }

    #[test]
    fn outcome_carries_usage_and_finish_reason() {
        let response = ChatResponse {
            content: "Hi there".to_owned(),
            model: "gpt-4".to_owned(),
            usage: Some(crate::llm::TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            finish_reason: Some("stop".to_owned()),
        };

        let outcome = AskOutcome::from(response);
        assert_eq!(outcome.text, "Hi there");
        assert_eq!(outcome.tokens_used, Some(15));
        assert_eq!(outcome.finish_reason.as_deref(), Some("stop"));
    }
}
