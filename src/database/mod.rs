// ABOUTME: SQLite connection management and schema migrations for transcript storage
// ABOUTME: Owns the connection pool and hands out the transcript store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

//! # Database Management
//!
//! SQLite-backed persistence for conversation transcripts. The pool is
//! created once at startup; migrations run before the server accepts
//! traffic.

pub mod transcripts;

pub use transcripts::TranscriptStore;

use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite, SqlitePool};

use crate::config::environment::DatabaseUrl;

/// Database manager for transcript storage
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// For file-backed databases the parent directory is created if missing
    /// and SQLite is asked to create the file itself (`mode=rwc`).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails
    pub async fn new(database_url: &DatabaseUrl) -> Result<Self> {
        if let DatabaseUrl::SQLite { path } = database_url {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        let connection_options = if database_url.is_memory() {
            database_url.to_connection_string()
        } else {
            format!("{}?mode=rwc", database_url.to_connection_string())
        };

        let pool = SqlitePool::connect(&connection_options)
            .await
            .with_context(|| format!("Failed to connect to database {database_url}"))?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create a transcript store over this database
    #[must_use]
    pub fn transcripts(&self) -> TranscriptStore {
        TranscriptStore::new(self.pool.clone())
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if a migration statement fails
    pub async fn migrate(&self) -> Result<()> {
        self.migrate_transcripts().await?;
        Ok(())
    }

    /// Create transcript tables and indexes
    async fn migrate_transcripts(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS conversation_turns (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL,
                assistant_id TEXT,
                run_id TEXT,
                role TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversation_turns_thread ON conversation_turns(thread_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversation_turns_created ON conversation_turns(created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversation_turns_role ON conversation_turns(role)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
