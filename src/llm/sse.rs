// ABOUTME: Line-buffering SSE decoder for upstream LLM streaming responses
// ABOUTME: Handles partial lines across TCP boundaries, multiple events per chunk, and [DONE]
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! # SSE Stream Decoder
//!
//! A line-buffering decoder for the Server-Sent Events framing used by
//! chat-completion APIs. Solves two correctness issues that naive per-chunk
//! parsing gets wrong:
//!
//! 1. **Multiple events per TCP chunk**: When network buffers batch several
//!    SSE events into a single `bytes_stream()` chunk, all events are emitted
//!    (not just the first).
//!
//! 2. **Partial lines across TCP boundaries**: When a JSON payload is split
//!    across two TCP chunks, the line buffer accumulates partial data until a
//!    complete line arrives.
//!
//! Framing rules:
//!
//! - A line is a data line when it starts with `data:`; at most one space
//!   after the colon is stripped before the payload is read.
//! - The literal payload `[DONE]` ends the stream. It does not surface as a
//!   chunk, and nothing is read from the connection afterwards.
//! - Blank lines and lines carrying other SSE fields (`event:`, `id:`,
//!   `retry:`, comments) are skipped silently.
//! - A trailing unterminated line is flushed when the byte stream ends.
//!
//! Each provider supplies a `parse_data` closure that converts raw payload
//! strings into [`StreamChunk`] values; the framing is handled once here.

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::unfold;
use futures_util::{future, Stream, StreamExt};

use super::{ChatStream, StreamChunk};
use crate::errors::AppError;

/// A decoded SSE event from the upstream byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the marker (and at most one space) stripped
    Payload(String),
    /// The `[DONE]` termination sentinel
    Done,
}

/// Classify a complete line as an SSE event
///
/// Returns `None` for blank lines, non-data fields, and empty payloads.
fn classify(line: &str) -> Option<SseEvent> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("data:")?;
    let payload = rest.strip_prefix(' ').unwrap_or(rest);

    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }
    if payload.trim().is_empty() {
        return None;
    }
    Some(SseEvent::Payload(payload.to_owned()))
}

/// Line-buffering SSE decoder that handles partial lines across TCP chunk boundaries
///
/// SSE streams are newline-delimited. TCP does not guarantee alignment between
/// network chunks and SSE event boundaries. This decoder buffers incomplete
/// lines and emits complete events only when a full line (terminated by `\n`)
/// is available.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Accumulated bytes not yet terminated by a newline
    buffer: String,
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from a TCP chunk into the buffer, returning any complete SSE events
    ///
    /// Bytes are appended to the internal buffer. Complete lines (terminated
    /// by `\n`, with an optional preceding `\r`) are extracted and classified.
    /// Any trailing partial line remains in the buffer for the next `feed()`.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        let text = String::from_utf8_lossy(bytes);
        self.buffer.push_str(&text);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            if let Some(event) = classify(&self.buffer[..newline_pos]) {
                events.push(event);
            }
            self.buffer.drain(..=newline_pos);
        }
        events
    }

    /// Flush any remaining buffered content as a final event
    ///
    /// Called when the byte stream ends. If there is a partial line in the
    /// buffer (no trailing newline), attempt to classify it.
    pub fn flush(&mut self) -> Vec<SseEvent> {
        let remaining = mem::take(&mut self.buffer);
        classify(&remaining).into_iter().collect()
    }
}

/// Internal state for the decode unfold
struct DecodeState {
    lines: SseLineBuffer,
    pending: VecDeque<Result<StreamChunk, AppError>>,
    finished: bool,
}

impl DecodeState {
    /// Absorb classified events into the pending queue
    ///
    /// Stops at the first `Done` sentinel; anything framed after it is
    /// discarded.
    fn absorb<F>(&mut self, events: Vec<SseEvent>, parse_data: &F)
    where
        F: Fn(&str) -> Option<Result<StreamChunk, AppError>>,
    {
        for event in events {
            if self.finished {
                break;
            }
            match event {
                SseEvent::Payload(payload) => {
                    if let Some(result) = parse_data(&payload) {
                        self.pending.push_back(result);
                    }
                }
                SseEvent::Done => self.finished = true,
            }
        }
    }
}

/// Decode a raw upstream byte stream into a chunk stream
///
/// Wraps a `reqwest` byte stream with SSE line buffering. The `parse_data`
/// closure converts provider-specific payload strings into [`StreamChunk`]
/// values, returning `None` to skip payloads that don't produce output
/// (malformed JSON, metadata-only events).
///
/// The returned stream is pull-based: each `next()` call reads at most one
/// TCP chunk beyond what is already buffered. Dropping it closes the
/// connection.
pub fn decode_sse_stream<S, F>(byte_stream: S, parse_data: F, provider_name: &'static str) -> ChatStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    F: Fn(&str) -> Option<Result<StreamChunk, AppError>> + Send + 'static,
{
    let state = DecodeState {
        lines: SseLineBuffer::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    // Unfold keeps decoder state across async iterations. Each iteration
    // either drains a pending chunk or reads the next TCP chunk.
    let stream = unfold(
        (
            Box::pin(byte_stream)
                as Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
            state,
            parse_data,
            provider_name,
        ),
        |(mut byte_stream, mut state, parse_data, provider_name)| async move {
            loop {
                // Drain pending chunks first (multiple SSE events per TCP chunk)
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, (byte_stream, state, parse_data, provider_name)));
                }

                if state.finished {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        let events = state.lines.feed(&bytes);
                        state.absorb(events, &parse_data);
                    }
                    Some(Err(e)) => {
                        state.finished = true;
                        return Some((
                            Err(AppError::external_service(
                                provider_name,
                                format!("Stream read error: {e}"),
                            )),
                            (byte_stream, state, parse_data, provider_name),
                        ));
                    }
                    None => {
                        let events = state.lines.flush();
                        state.absorb(events, &parse_data);
                        state.finished = true;
                    }
                }
            }
        },
    );

    // Filter out empty deltas (unless it's the final chunk)
    let filtered = stream.filter(|result| {
        future::ready(
            result
                .as_ref()
                .map_or(true, |chunk| !chunk.delta.is_empty() || chunk.is_final),
        )
    });

    Box::pin(filtered)
}
