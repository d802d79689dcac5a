// ABOUTME: Bounded in-memory activity log backing the logs endpoint
// ABOUTME: Keeps the most recent request and server events for quick diagnostics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! # Activity Log
//!
//! A fixed-capacity ring of recent server activity, populated by the request
//! logging middleware and served by `GET /api/chat/logs`. This is a
//! diagnostics convenience, not an audit trail; restarting the server clears
//! it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Maximum number of entries retained; older entries are evicted
const MAX_ENTRIES: usize = 1000;

/// One recorded activity entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
    /// Severity (`info`, `warn`, `error`)
    pub level: String,
    /// Human-readable message
    pub message: String,
    /// HTTP method, for request entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request path, for request entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Response status code, for request entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Request duration in milliseconds, for request entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ActivityEntry {
    /// Create a plain message entry
    #[must_use]
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: level.into(),
            message: message.into(),
            method: None,
            path: None,
            status_code: None,
            duration_ms: None,
        }
    }

    /// Create an entry describing a handled HTTP request
    #[must_use]
    pub fn request(
        level: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        duration_ms: u64,
    ) -> Self {
        let method = method.into();
        let path = path.into();
        Self {
            timestamp: Utc::now(),
            level: level.into(),
            message: format!("{method} {path} {status_code} ({duration_ms}ms)"),
            method: Some(method),
            path: Some(path),
            status_code: Some(status_code),
            duration_ms: Some(duration_ms),
        }
    }
}

/// Shared, bounded log of recent activity
#[derive(Clone)]
pub struct ActivityLog {
    entries: Arc<RwLock<VecDeque<ActivityEntry>>>,
}

impl ActivityLog {
    /// Create an empty activity log
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Record an entry, evicting the oldest once the capacity is reached
    pub async fn record(&self, entry: ActivityEntry) {
        let mut entries = self.entries.write().await;
        entries.push_back(entry);
        while entries.len() > MAX_ENTRIES {
            entries.pop_front();
        }
    }

    /// Get the most recent entries, newest first
    ///
    /// An optional level filter keeps only entries with a matching severity
    /// (case-insensitive).
    pub async fn recent(&self, limit: usize, level: Option<&str>) -> Vec<ActivityEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .rev()
            .filter(|e| level.map_or(true, |l| e.level.eq_ignore_ascii_case(l)))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Get the number of retained entries
    pub async fn entry_count(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recent_returns_newest_first() {
        let log = ActivityLog::new();
        log.record(ActivityEntry::new("info", "first")).await;
        log.record(ActivityEntry::new("info", "second")).await;
        log.record(ActivityEntry::new("info", "third")).await;

        let entries = log.recent(2, None).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "third");
        assert_eq!(entries[1].message, "second");
    }

    #[tokio::test]
    async fn capacity_evicts_oldest_entries() {
        let log = ActivityLog::new();
        for i in 0..(MAX_ENTRIES + 5) {
            log.record(ActivityEntry::new("info", format!("entry-{i}")))
                .await;
        }

        assert_eq!(log.entry_count().await, MAX_ENTRIES);
        let entries = log.recent(MAX_ENTRIES, None).await;
        assert_eq!(entries[0].message, format!("entry-{}", MAX_ENTRIES + 4));
        // The first five entries were evicted
        assert_eq!(
            entries.last().map(|e| e.message.clone()),
            Some("entry-5".to_owned())
        );
    }

    #[tokio::test]
    async fn level_filter_is_case_insensitive() {
        let log = ActivityLog::new();
        log.record(ActivityEntry::new("info", "ok")).await;
        log.record(ActivityEntry::new("error", "boom")).await;
        log.record(ActivityEntry::new("warn", "careful")).await;

        let errors = log.recent(10, Some("ERROR")).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "boom");
    }

    #[tokio::test]
    async fn request_entries_carry_http_fields() {
        let log = ActivityLog::new();
        log.record(ActivityEntry::request("info", "GET", "/api/chat/status", 200, 3))
            .await;

        let entries = log.recent(1, None).await;
        assert_eq!(entries[0].method.as_deref(), Some("GET"));
        assert_eq!(entries[0].path.as_deref(), Some("/api/chat/status"));
        assert_eq!(entries[0].status_code, Some(200));
        assert_eq!(entries[0].message, "GET /api/chat/status 200 (3ms)");
    }
}
