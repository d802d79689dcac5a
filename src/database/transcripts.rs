// ABOUTME: Database operations for conversation transcripts
// ABOUTME: Records user and assistant turns and serves per-thread history in order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::{AppError, AppResult};
use crate::models::{ConversationTurn, TurnRole};

/// Transcript database operations
///
/// Turns are written append-only. Timestamps are stored as RFC 3339 text,
/// which sorts lexicographically in chronological order.
#[derive(Clone)]
pub struct TranscriptStore {
    pool: SqlitePool,
}

impl TranscriptStore {
    /// Create a new transcript store
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a single conversation turn
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn append(&self, turn: &ConversationTurn) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO conversation_turns (id, thread_id, assistant_id, run_id, role, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(&turn.id)
        .bind(&turn.thread_id)
        .bind(&turn.assistant_id)
        .bind(&turn.run_id)
        .bind(turn.role.as_str())
        .bind(&turn.message)
        .bind(turn.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record turn: {e}")))?;

        Ok(())
    }

    /// Get all turns for a thread in chronological order
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn thread_messages(&self, thread_id: &str) -> AppResult<Vec<ConversationTurn>> {
        let rows = sqlx::query(
            r"
            SELECT id, thread_id, assistant_id, run_id, role, message, created_at
            FROM conversation_turns
            WHERE thread_id = $1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load thread turns: {e}")))?;

        rows.iter().map(turn_from_row).collect()
    }

    /// Get the turn count for a thread
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn turn_count(&self, thread_id: &str) -> AppResult<i64> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count
            FROM conversation_turns
            WHERE thread_id = $1
            ",
        )
        .bind(thread_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count thread turns: {e}")))?;

        Ok(row.get("count"))
    }
}

/// Map a database row back into a domain turn
fn turn_from_row(row: &SqliteRow) -> AppResult<ConversationTurn> {
    let role_raw: String = row.get("role");
    let role = TurnRole::try_from_str(&role_raw)
        .ok_or_else(|| AppError::database(format!("Unknown turn role: {role_raw}")))?;

    let created_at_raw: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_raw)
        .map_err(|e| AppError::database(format!("Invalid turn timestamp: {e}")))?
        .with_timezone(&Utc);

    Ok(ConversationTurn {
        id: row.get("id"),
        thread_id: row.get("thread_id"),
        assistant_id: row.get("assistant_id"),
        run_id: row.get("run_id"),
        role,
        message: row.get("message"),
        created_at,
    })
}
