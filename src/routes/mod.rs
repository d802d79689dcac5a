// ABOUTME: Route module organization for Switchboard HTTP endpoints
// ABOUTME: Provides centralized route definitions organized by domain with thin handlers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! Route modules for the Switchboard server
//!
//! Each domain module contains route definitions and thin handler functions
//! that delegate to the relay, transcript store, or activity log. Handlers
//! never hold business logic; they translate between HTTP and the core
//! types.

/// Chat routes: one-shot asks, thread streaming, transcripts, live events
pub mod chat;
/// Activity log routes
pub mod logs;
/// Status probe and health check routes
pub mod status;

/// Chat route handlers
pub use chat::ChatRoutes;
/// Activity log route handlers
pub use logs::LogRoutes;
/// Health check route handlers
pub use status::HealthRoutes;
/// Status probe route handlers
pub use status::StatusRoutes;
