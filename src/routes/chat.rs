// ABOUTME: Chat route handlers for one-shot asks and thread-scoped streaming
// ABOUTME: Provides REST endpoints for completions, transcripts, and live thread events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! Chat routes for LLM conversations
//!
//! This module carries the main chat surface: the one-shot ask endpoint
//! (streaming or buffered per request), thread-scoped streaming with
//! transcript persistence, transcript retrieval, and a live SSE feed of
//! thread events for observers that do not hold the generation stream.
//!
//! Streaming responses use the same outward framing everywhere: each frame
//! is a JSON object with optional `content`, `finishReason`, and `error`
//! fields, and exactly one `[DONE]` marker terminates the stream on both
//! normal and error completion. A client that disconnects mid-stream gets
//! nothing further; the upstream connection is dropped with it.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::{
    errors::AppError,
    llm::ChatStream,
    models::ConversationTurn,
    relay::{AskOutcome, AskRequest},
    server::ServerResources,
};

/// Terminal marker closing every completed outward stream
const DONE_MARKER: &str = "[DONE]";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for a buffered (non-streaming) ask
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    /// Full assistant reply
    pub response: String,
    /// Total tokens consumed when the provider reports usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    /// Provider-reported stop cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl From<AskOutcome> for AskResponse {
    fn from(outcome: AskOutcome) -> Self {
        Self {
            response: outcome.text,
            tokens_used: outcome.tokens_used,
            finish_reason: outcome.finish_reason,
        }
    }
}

/// Request to stream a reply inside a thread
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadStreamRequest {
    /// User message appended to the thread
    pub message: String,
    /// Assistant persona the reply is attributed to
    #[serde(default)]
    pub assistant_id: Option<String>,
}

/// One persisted turn in a thread transcript
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    /// Turn ID
    pub id: String,
    /// Owning thread
    pub thread_id: String,
    /// Assistant persona for assistant turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    /// Exchange this turn belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// `user` or `assistant`
    pub role: String,
    /// Turn text
    pub message: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

impl From<ConversationTurn> for TurnResponse {
    fn from(turn: ConversationTurn) -> Self {
        Self {
            id: turn.id,
            thread_id: turn.thread_id,
            assistant_id: turn.assistant_id,
            run_id: turn.run_id,
            role: turn.role.as_str().to_owned(),
            message: turn.message,
            created_at: turn.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Chat Routes
// ============================================================================

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            // One-shot completion, streaming or buffered
            .route("/api/chat/ask", post(Self::ask))
            // Thread-scoped streaming with transcript persistence
            .route(
                "/api/chat/threads/:thread_id/stream",
                post(Self::stream_thread_message),
            )
            .route(
                "/api/chat/threads/:thread_id/messages",
                get(Self::get_thread_messages),
            )
            // Live event feed for observers
            .route(
                "/api/chat/threads/:thread_id/events",
                get(Self::thread_events),
            )
            .with_state(resources)
    }

    /// Run a one-shot completion, streamed or buffered per the request.
    async fn ask(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<AskRequest>,
    ) -> Result<Response, AppError> {
        if request.wants_stream() {
            let chunks = resources.relay.ask_streaming(&request)?;
            Ok(completion_sse(chunks).into_response())
        } else {
            let outcome = resources.relay.ask_complete(&request).await?;
            Ok((StatusCode::OK, Json(AskResponse::from(outcome))).into_response())
        }
    }

    /// Stream an assistant reply for a thread message via SSE.
    async fn stream_thread_message(
        State(resources): State<Arc<ServerResources>>,
        Path(thread_id): Path<String>,
        Json(request): Json<ThreadStreamRequest>,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
        let chunks = resources
            .relay
            .stream_chat(&thread_id, &request.message, request.assistant_id.as_deref())
            .await?;
        Ok(completion_sse(chunks))
    }

    /// Return a thread's persisted transcript, oldest first.
    ///
    /// Unknown threads yield an empty array rather than 404; a thread exists
    /// exactly when it has turns.
    async fn get_thread_messages(
        State(resources): State<Arc<ServerResources>>,
        Path(thread_id): Path<String>,
    ) -> Result<Json<Vec<TurnResponse>>, AppError> {
        let turns = resources.transcripts.thread_messages(&thread_id).await?;
        Ok(Json(turns.into_iter().map(TurnResponse::from).collect()))
    }

    /// Subscribe to a thread's live event feed.
    ///
    /// Events mirror the notification bus: `token`, `completed`, and `error`
    /// as named SSE events with JSON payloads. A subscriber that falls
    /// behind skips the missed events and keeps receiving.
    async fn thread_events(
        State(resources): State<Arc<ServerResources>>,
        Path(thread_id): Path<String>,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        let mut rx = resources.bus.subscribe(&thread_id).await;

        let stream = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        yield Ok(Event::default()
                            .event(event.name)
                            .data(event.payload.to_string()));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(thread_id = %thread_id, skipped, "Event subscriber lagging");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        };

        Sse::new(stream).keep_alive(KeepAlive::default())
    }
}

// ============================================================================
// Outward Stream Encoding
// ============================================================================

/// Encodes a completion stream as SSE frames with a single `[DONE]` marker.
///
/// Each delta becomes `{"content": ...}`; the final chunk adds
/// `finishReason` when the provider reports one. An upstream error becomes
/// one `{"error": ...}` frame, and the `[DONE]` marker still follows so
/// clients can tear down uniformly.
fn completion_sse(mut chunks: ChatStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        while let Some(result) = chunks.next().await {
            match result {
                Ok(chunk) => {
                    let mut frame = Map::new();
                    if !chunk.delta.is_empty() {
                        frame.insert("content".to_owned(), Value::String(chunk.delta));
                    }
                    if let Some(reason) = chunk.finish_reason {
                        frame.insert("finishReason".to_owned(), Value::String(reason));
                    }
                    if !frame.is_empty() {
                        yield Ok(Event::default().data(Value::Object(frame).to_string()));
                    }
                }
                Err(e) => {
                    let frame = serde_json::json!({ "error": e.to_string() });
                    yield Ok(Event::default().data(frame.to_string()));
                    break;
                }
            }
        }
        yield Ok(Event::default().data(DONE_MARKER));
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
