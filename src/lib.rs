// ABOUTME: Main library entry point for the Switchboard chat relay backend
// ABOUTME: Bridges browser chat clients to LLM chat-completion APIs over SSE
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! # Switchboard
//!
//! A streaming chat relay backend. Switchboard sits between browser chat
//! clients and an OpenAI-style chat-completion API: it validates inbound
//! requests, opens the upstream connection, re-encodes the provider's SSE
//! stream into a stable outward wire format, and persists thread
//! transcripts along the way.
//!
//! ## Features
//!
//! - **Streaming first**: token deltas flow to the client as the provider
//!   produces them, with no read-ahead buffering
//! - **One-shot asks**: buffered completions for clients that skip SSE
//! - **Thread transcripts**: both sides of every exchange persisted to
//!   SQLite, retrievable oldest-first
//! - **Live thread events**: a broadcast bus lets observers follow a
//!   generation without holding the stream
//! - **Operational surface**: status probe, health check, and an
//!   in-memory activity log
//!
//! ## Quick Start
//!
//! 1. Set `OPENAI_API_KEY` (and optionally `OPENAI_BASE_URL`)
//! 2. Start the server with `switchboard-server`
//! 3. POST to `/api/chat/ask` or open a thread stream
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use switchboard::config::environment::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = ServerConfig::from_env()?;
//!
//!     println!("Switchboard configured with port: HTTP={}", config.http_port);
//!
//!     Ok(())
//! }
//! ```

// ── Public API ──────────────────────────────────────────────────────────
// These modules are used by the server binary (src/bin/) and integration
// tests (tests/). They must remain `pub` so external consumers can access
// them.

/// Bounded in-memory log of recent HTTP requests
pub mod activity_log;

/// Configuration management from environment variables
pub mod config;

/// Transcript persistence over `SQLite`
pub mod database;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// LLM provider abstraction and the OpenAI-compatible client
pub mod llm;

/// Production logging and structured output
pub mod logging;

/// HTTP middleware for authentication, CORS, and request logging
pub mod middleware;

/// Common data models for conversation turns
pub mod models;

/// Core relay between HTTP clients and the LLM provider
pub mod relay;

/// `HTTP` routes for chat, status, and activity log endpoints
pub mod routes;

/// Server assembly: resources, router, and the serve loop
pub mod server;

/// Server-Sent Events fan-out for live thread subscribers
pub mod sse;
