// ABOUTME: Status probe and health check route handlers for service monitoring
// ABOUTME: Reports upstream LLM connectivity alongside liveness endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! Status and health routes for service monitoring
//!
//! The status probe reports upstream connectivity without ever failing the
//! request itself: an unreachable provider shows up as
//! `openAIConnected: false` in a 200 response, so dashboards can render a
//! degraded state instead of an error page. The plain health endpoint stays
//! independent of the provider for load balancer checks.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::server::ServerResources;

/// Body of the status probe
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// `running` whenever the probe executes
    pub status: String,
    /// Crate version serving the request
    pub version: String,
    /// Whether the upstream provider answered the connectivity probe
    #[serde(rename = "openAIConnected")]
    pub openai_connected: bool,
}

/// Status probe routes handler
pub struct StatusRoutes;

impl StatusRoutes {
    /// Create the status probe route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat/status", get(Self::status))
            .with_state(resources)
    }

    /// Probe upstream connectivity; always 200.
    async fn status(State(resources): State<Arc<ServerResources>>) -> Json<StatusResponse> {
        let connected = resources.relay.check_connection().await;

        Json(StatusResponse {
            status: "running".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            openai_connected: connected,
        })
    }
}

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the liveness route
    pub fn routes() -> Router {
        async fn health_handler() -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "status": "healthy",
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        }

        Router::new().route("/health", get(health_handler))
    }
}
