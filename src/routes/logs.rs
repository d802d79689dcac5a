// ABOUTME: Activity log route handler exposing recent request records
// ABOUTME: Serves the in-memory ring buffer with limit and level filters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! Activity log routes
//!
//! Serves the bounded in-memory request log kept by the request logging
//! middleware. This is operational visibility for a single process, not an
//! audit trail; entries vanish on restart and under ring-buffer pressure.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::activity_log::ActivityEntry;
use crate::server::ServerResources;

/// Entries returned when the caller omits `limit`
const DEFAULT_LIMIT: usize = 100;
/// Upper bound on a single page of entries
const MAX_LIMIT: usize = 1000;

/// Query parameters for the logs endpoint
#[derive(Debug, Deserialize, Default)]
pub struct LogsQuery {
    /// Maximum entries to return, clamped to 1..=1000
    pub limit: Option<usize>,
    /// Case-insensitive level filter, e.g. `info` or `warn`
    pub level: Option<String>,
}

/// Response for the logs endpoint
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    /// Number of entries returned
    pub count: usize,
    /// Matching entries, newest first
    pub entries: Vec<ActivityEntry>,
}

/// Activity log routes handler
pub struct LogRoutes;

impl LogRoutes {
    /// Create the activity log route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat/logs", get(Self::recent_logs))
            .with_state(resources)
    }

    /// Return recent activity entries, newest first.
    async fn recent_logs(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<LogsQuery>,
    ) -> Json<LogsResponse> {
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let entries = resources
            .activity
            .recent(limit, query.level.as_deref())
            .await;

        Json(LogsResponse {
            count: entries.len(),
            entries,
        })
    }
}
