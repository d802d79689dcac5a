// ABOUTME: Request logging middleware feeding the in-memory activity log
// ABOUTME: Records method, path, status, and latency for every handled request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{error, info, warn};

use crate::activity_log::ActivityEntry;
use crate::server::ServerResources;

/// Axum middleware recording every handled request in the activity log.
///
/// The entry level follows the response class: `info` for success, `warn`
/// for client errors, `error` for server errors. Long-lived SSE responses
/// are recorded when the response headers go out, not when the stream ends.
pub async fn request_log_middleware(
    State(resources): State<Arc<ServerResources>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let level = if status.is_server_error() {
        error!(%method, %path, status = status.as_u16(), duration_ms, "Request failed");
        "error"
    } else if status.is_client_error() {
        warn!(%method, %path, status = status.as_u16(), duration_ms, "Request rejected");
        "warn"
    } else {
        info!(%method, %path, status = status.as_u16(), duration_ms, "Request handled");
        "info"
    };

    resources
        .activity
        .record(ActivityEntry::request(
            level,
            &method,
            &path,
            status.as_u16(),
            duration_ms,
        ))
        .await;

    response
}
