// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Exposes the environment-driven configuration used across the relay
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! Configuration module
//!
//! All configuration is environment-driven and loaded once at startup; see
//! [`environment::ServerConfig`].

/// Environment and server configuration
pub mod environment;
