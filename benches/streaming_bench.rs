// ABOUTME: Criterion benchmarks for the SSE streaming hot path
// ABOUTME: Measures line-buffer decoding under different chunk shapes and outward frame encoding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! Criterion benchmarks for the streaming hot path.
//!
//! Every token of every reply passes through the SSE line buffer and back
//! out as a JSON frame, so these two conversions dominate per-token cost.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::{Map, Value};
use switchboard::llm::sse::SseLineBuffer;
use switchboard::llm::StreamChunk;
use switchboard::models::ConversationTurn;

/// A realistic upstream event carrying a short content delta
const UPSTREAM_EVENT: &str = concat!(
    "data: {\"id\":\"chatcmpl-123\",\"object\":\"chat.completion.chunk\",",
    "\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hello\"},",
    "\"finish_reason\":null}]}\n\n"
);

fn bench_line_buffer_feed(c: &mut Criterion) {
    let mut group = c.benchmark_group("sse_line_buffer");

    // One event per network chunk, the common case for slow token streams
    let single = UPSTREAM_EVENT.as_bytes();
    group.throughput(Throughput::Bytes(single.len() as u64));
    group.bench_function("single_event_chunk", |b| {
        b.iter(|| {
            let mut buffer = SseLineBuffer::new();
            buffer.feed(black_box(single))
        });
    });

    // Many events batched into one chunk, the fast-producer case
    let batched: Vec<u8> = UPSTREAM_EVENT.as_bytes().repeat(50);
    group.throughput(Throughput::Bytes(batched.len() as u64));
    group.bench_function("batched_50_events", |b| {
        b.iter(|| {
            let mut buffer = SseLineBuffer::new();
            buffer.feed(black_box(&batched))
        });
    });

    // Pathological fragmentation: every byte arrives on its own
    group.throughput(Throughput::Bytes(single.len() as u64));
    group.bench_function("byte_fragmented_event", |b| {
        b.iter(|| {
            let mut buffer = SseLineBuffer::new();
            let mut events = Vec::new();
            for byte in single {
                events.extend(buffer.feed(black_box(std::slice::from_ref(byte))));
            }
            events
        });
    });

    group.finish();
}

fn bench_outward_frame_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("outward_frames");

    let chunk = StreamChunk {
        delta: "Hello, this is one streamed token batch.".to_owned(),
        is_final: false,
        finish_reason: None,
    };

    group.bench_function("content_frame", |b| {
        b.iter(|| {
            let chunk = black_box(&chunk);
            let mut frame = Map::new();
            if !chunk.delta.is_empty() {
                frame.insert("content".to_owned(), Value::String(chunk.delta.clone()));
            }
            if let Some(reason) = &chunk.finish_reason {
                frame.insert("finishReason".to_owned(), Value::String(reason.clone()));
            }
            Value::Object(frame).to_string()
        });
    });

    group.finish();
}

fn bench_transcript_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("transcript_json");

    let turns: Vec<ConversationTurn> = (0..50)
        .map(|i| {
            ConversationTurn::assistant("bench-thread", format!("Assistant reply number {i}"))
                .with_run_id(format!("run-{i}"))
        })
        .collect();

    let serialized = serde_json::to_vec(&turns).unwrap();
    group.throughput(Throughput::Bytes(serialized.len() as u64));
    group.bench_function("thread_50_turns", |b| {
        b.iter(|| serde_json::to_vec(black_box(&turns)).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_line_buffer_feed,
    bench_outward_frame_encoding,
    bench_transcript_serialization,
);
criterion_main!(benches);
