// ABOUTME: HTTP server assembly wiring routes, middleware, and shared resources
// ABOUTME: Owns the resource container, router construction, and the serve loop
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! # Server Assembly
//!
//! Builds the axum application from its parts: the resource container shared
//! by every handler, the route modules, and the middleware stack (CORS,
//! API key guard, request logging). The serve loop binds the configured
//! port and runs until ctrl-c.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tracing::info;

use crate::activity_log::ActivityLog;
use crate::config::environment::ServerConfig;
use crate::database::TranscriptStore;
use crate::errors::AppError;
use crate::middleware::{api_key_middleware, request_log_middleware, setup_cors};
use crate::relay::Relay;
use crate::routes::{ChatRoutes, HealthRoutes, LogRoutes, StatusRoutes};
use crate::sse::ThreadNotificationBus;

/// Centralized resource container for dependency injection
///
/// Holds every shared handle the handlers need, so routes receive one
/// `Arc<ServerResources>` instead of threading individual resources through
/// each constructor.
#[derive(Clone)]
pub struct ServerResources {
    /// Server configuration resolved from the environment
    pub config: Arc<ServerConfig>,
    /// Chat relay orchestrating LLM traffic
    pub relay: Relay,
    /// Persisted thread transcripts
    pub transcripts: TranscriptStore,
    /// Fan-out bus for live thread events
    pub bus: ThreadNotificationBus,
    /// Bounded in-memory request log
    pub activity: ActivityLog,
}

impl ServerResources {
    /// Create the resource container with proper Arc sharing.
    #[must_use]
    pub fn new(
        config: Arc<ServerConfig>,
        relay: Relay,
        transcripts: TranscriptStore,
        bus: ThreadNotificationBus,
    ) -> Self {
        Self {
            config,
            relay,
            transcripts,
            bus,
            activity: ActivityLog::new(),
        }
    }
}

/// Build the complete application router.
///
/// The API key guard wraps only the `/api` routes; `/health` stays open for
/// load balancer probes. Request logging and CORS wrap everything.
pub fn build_router(resources: &Arc<ServerResources>) -> Router {
    let api_routes = ChatRoutes::routes(resources.clone())
        .merge(StatusRoutes::routes(resources.clone()))
        .merge(LogRoutes::routes(resources.clone()))
        .layer(middleware::from_fn_with_state(
            resources.clone(),
            api_key_middleware,
        ));

    Router::new()
        .merge(api_routes)
        .merge(HealthRoutes::routes())
        .fallback(fallback_handler)
        .layer(middleware::from_fn_with_state(
            resources.clone(),
            request_log_middleware,
        ))
        .layer(setup_cors(&resources.config.cors))
}

/// 404 handler for unmatched paths.
async fn fallback_handler() -> AppError {
    AppError::not_found("Route")
}

/// Bind the configured port and serve until ctrl-c.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server loop fails.
pub async fn serve(resources: Arc<ServerResources>) -> Result<()> {
    let addr = format!("0.0.0.0:{}", resources.config.http_port);
    let app = build_router(&resources);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Switchboard listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

/// Resolves when the process receives ctrl-c.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install ctrl-c handler: {e}");
        return;
    }
    info!("Shutdown signal received, draining connections");
}
