// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Item Store
//!
//! sqlx-backed `PersistenceManager` used by server adapters with
//! auto-persist enabled. Each session maps onto one SQLite transaction;
//! commit and rollback consume the session, and a dropped session rolls
//! back with the transaction (sqlx's drop semantics).
//!
//! The schema is bootstrapped on connect, so a fresh database file (or
//! the `sqlite::memory:` URL in tests) works without migrations.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool, Transaction};

use typed_pipeline_domain::services::persistence::{PersistenceManager, PersistenceSession};
use typed_pipeline_domain::{PipelineError, PipelineItem};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS processed_items (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    step_name       TEXT    NOT NULL,
    sequence_number INTEGER NOT NULL,
    child_index     INTEGER,
    payload         TEXT    NOT NULL,
    persisted_at    TEXT    NOT NULL DEFAULT (datetime('now'))
)
"#;

/// SQLite-backed persistence manager.
pub struct SqliteItemStore {
    pool: SqlitePool,
}

impl SqliteItemStore {
    /// Connects to the given SQLite URL and bootstraps the schema.
    ///
    /// # Errors
    /// `PipelineError::PersistenceError` on connection or schema
    /// failures.
    pub async fn connect(url: &str) -> Result<Self, PipelineError> {
        // An in-memory database exists per connection; pin the pool to a
        // single connection so every session sees the same schema.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| {
                PipelineError::persistence(format!("Failed to connect to {}: {}", url, e))
            })?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| PipelineError::persistence(format!("Failed to create schema: {}", e)))?;

        Ok(Self { pool })
    }

    /// Number of rows persisted for one step (tests, diagnostics).
    pub async fn count_for_step(&self, step_name: &str) -> Result<i64, PipelineError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM processed_items WHERE step_name = ?1")
                .bind(step_name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| PipelineError::persistence(e.to_string()))?;
        Ok(count)
    }
}

#[async_trait]
impl PersistenceManager for SqliteItemStore {
    async fn begin(&self) -> Result<Box<dyn PersistenceSession>, PipelineError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PipelineError::persistence(format!("Failed to begin transaction: {}", e)))?;
        Ok(Box::new(SqliteSession { tx }))
    }
}

struct SqliteSession {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl PersistenceSession for SqliteSession {
    async fn persist(
        &mut self,
        step_name: &str,
        item: &PipelineItem,
    ) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO processed_items (step_name, sequence_number, child_index, payload) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(step_name)
        .bind(item.sequence() as i64)
        .bind(item.child_index().map(|c| c as i64))
        .bind(item.payload().to_string())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| PipelineError::persistence(format!("Failed to persist item: {}", e)))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PipelineError> {
        self.tx
            .commit()
            .await
            .map_err(|e| PipelineError::persistence(format!("Failed to commit: {}", e)))
    }

    async fn rollback(self: Box<Self>) -> Result<(), PipelineError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| PipelineError::persistence(format!("Failed to rollback: {}", e)))
    }
}
