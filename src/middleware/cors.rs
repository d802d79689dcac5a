// ABOUTME: CORS middleware configuration for the chat API endpoints
// ABOUTME: Provides Cross-Origin Resource Sharing setup for browser clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

use axum::http::{header::HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::environment::CorsConfig;

/// Configures cross-origin access for browser-based chat clients.
///
/// Origins come from `CORS_ORIGINS`; a list containing `*` (or an empty
/// list) allows any origin, which is the development default. Streaming
/// responses need no extra CORS treatment since SSE rides on a plain GET
/// or POST.
#[must_use]
pub fn setup_cors(config: &CorsConfig) -> CorsLayer {
    let wildcard = config.allowed_origins.is_empty()
        || config.allowed_origins.iter().any(|origin| origin == "*");

    let allow_origin = if wildcard {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| {
                let trimmed = origin.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    HeaderValue::from_str(trimmed).ok()
                }
            })
            .collect();

        if origins.is_empty() {
            // Nothing parsed cleanly; fall back to open rather than
            // locking every browser client out.
            AllowOrigin::any()
        } else {
            AllowOrigin::list(origins)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("origin"),
            HeaderName::from_static("access-control-request-method"),
            HeaderName::from_static("access-control-request-headers"),
            HeaderName::from_static("x-api-key"),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
}
