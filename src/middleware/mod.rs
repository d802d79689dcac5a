// ABOUTME: HTTP middleware for inbound authentication, CORS, and request logging
// ABOUTME: Applied as tower layers around the API router in the server module
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

pub mod auth;
pub mod cors;
pub mod request_log;

// Inbound API key guard
pub use auth::api_key_middleware;

// CORS configuration
pub use cors::setup_cors;

// Activity log capture for every request
pub use request_log::request_log_middleware;
