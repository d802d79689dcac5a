// ABOUTME: Shared test helpers and utilities for integration tests
// ABOUTME: Exports the axum request builder and the scripted mock LLM provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

// Each integration test binary compiles these helpers separately, so any
// helper unused by one binary would otherwise warn as dead code.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod axum_test;
pub mod mock_provider;
