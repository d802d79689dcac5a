// ABOUTME: Server-Sent Events infrastructure for live conversation updates
// ABOUTME: Provides the per-thread notification bus consumed by the thread events endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

/// Per-thread broadcast bus for token, completion, and error events
pub mod bus;

pub use bus::{ThreadEvent, ThreadNotificationBus};
