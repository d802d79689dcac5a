// ABOUTME: Inbound API key middleware guarding the chat API surface
// ABOUTME: Checks the x-api-key header against the configured shared key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! # Inbound Authentication
//!
//! Switchboard authenticates inbound requests with a single shared key
//! carried in the `x-api-key` header. When no key is configured the API is
//! open, which matches local development where the server binds to loopback.
//! The health probe is mounted outside this guard so deployment checks keep
//! working while the key rotates.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::config::environment::AuthConfig;
use crate::errors::{AppError, AppResult};
use crate::server::ServerResources;

/// Header carrying the shared inbound API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Verifies the inbound API key against the configured value.
///
/// # Errors
///
/// Returns [`AppError::auth_required`] when a key is configured but the
/// header is absent, and [`AppError::auth_invalid`] when the header value
/// does not match.
pub fn check_api_key(headers: &HeaderMap, config: &AuthConfig) -> AppResult<()> {
    let Some(expected) = config.api_key.as_deref() else {
        return Ok(());
    };

    match headers.get(API_KEY_HEADER).map(|value| value.to_str()) {
        None => Err(AppError::auth_required()),
        Some(Ok(provided)) if provided == expected => Ok(()),
        Some(_) => Err(AppError::auth_invalid("Invalid API key")),
    }
}

/// Axum middleware enforcing the inbound API key on every `/api` route.
pub async fn api_key_middleware(
    State(resources): State<Arc<ServerResources>>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(e) = check_api_key(req.headers(), &resources.config.auth) {
        warn!(path = %req.uri().path(), "Rejected request: {e}");
        return e.into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn guarded() -> AuthConfig {
        AuthConfig {
            api_key: Some("secret-key".to_owned()),
        }
    }

    #[test]
    fn open_when_no_key_configured() {
        let config = AuthConfig { api_key: None };
        assert!(check_api_key(&HeaderMap::new(), &config).is_ok());
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(check_api_key(&HeaderMap::new(), &guarded()).is_err());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("nope"));
        assert!(check_api_key(&headers, &guarded()).is_err());
    }

    #[test]
    fn matching_key_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("secret-key"));
        assert!(check_api_key(&headers, &guarded()).is_ok());
    }
}
