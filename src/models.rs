// ABOUTME: Core data models for conversation transcripts
// ABOUTME: Defines ConversationTurn and TurnRole shared by the store, relay, and routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! # Data Models
//!
//! Transcript structures shared across the relay. A thread is an opaque
//! conversation identifier; each persisted message in it is one
//! [`ConversationTurn`]. Turns are immutable once written; an assistant
//! turn's `message` is the in-order concatenation of every content fragment
//! streamed while it was generated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Prompt authored by the end user
    User,
    /// Text generated by the upstream model
    Assistant,
}

impl TurnRole {
    /// Stable string form used in persistence and on the wire
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse the persisted string form
    pub fn try_from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted message in a conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    /// Opaque unique identifier (32-char hex)
    pub id: String,
    /// Thread this turn belongs to
    pub thread_id: String,
    /// Assistant persona that produced or received the turn, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    /// Generation run shared by the user/assistant pair of one exchange
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Turn author
    pub role: TurnRole,
    /// Message text; unbounded
    pub message: String,
    /// Creation timestamp (UTC)
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn with a fresh identifier and current timestamp
    pub fn new(thread_id: impl Into<String>, role: TurnRole, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            thread_id: thread_id.into(),
            assistant_id: None,
            run_id: None,
            role,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a user-authored turn
    pub fn user(thread_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(thread_id, TurnRole::User, message)
    }

    /// Create an assistant-generated turn
    pub fn assistant(thread_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(thread_id, TurnRole::Assistant, message)
    }

    /// Attach an assistant identifier
    #[must_use]
    pub fn with_assistant_id(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant_id = Some(assistant_id.into());
        self
    }

    /// Attach a generation run identifier
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}

/// Generate a run identifier tying the two turns of one exchange together
#[must_use]
pub fn new_run_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_constructors() {
        let user = ConversationTurn::user("thread-1", "hello");
        assert_eq!(user.role, TurnRole::User);
        assert_eq!(user.thread_id, "thread-1");
        assert_eq!(user.message, "hello");
        assert!(user.assistant_id.is_none());
        assert_eq!(user.id.len(), 32);

        let assistant = ConversationTurn::assistant("thread-1", "hi there")
            .with_assistant_id("helper")
            .with_run_id(new_run_id());
        assert_eq!(assistant.role, TurnRole::Assistant);
        assert_eq!(assistant.assistant_id.as_deref(), Some("helper"));
        assert!(assistant.run_id.is_some());
    }

    #[test]
    fn test_turn_ids_are_unique() {
        let a = ConversationTurn::user("t", "x");
        let b = ConversationTurn::user("t", "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!(TurnRole::try_from_str("user"), Some(TurnRole::User));
        assert_eq!(
            TurnRole::try_from_str("assistant"),
            Some(TurnRole::Assistant)
        );
        assert_eq!(TurnRole::try_from_str("system"), None);
        assert_eq!(TurnRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let turn = ConversationTurn::user("thread-1", "hello").with_run_id("run-1");
        let json = serde_json::to_value(&turn).unwrap();
        assert!(json.get("threadId").is_some());
        assert!(json.get("runId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("assistantId").is_none());
        assert_eq!(json["role"], "user");
    }
}
