// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Persistence Ports
//!
//! Infrastructure ports for the auto-persist feature of server adapters.
//! The domain defines the session protocol; storage drivers implement it
//! in the runtime crate (SQLite via sqlx, in-memory for tests).
//!
//! ## Session Protocol
//!
//! Persistence is always scoped by an acquired session:
//!
//! 1. `PersistenceManager::begin` acquires a session bound to a
//!    transaction
//! 2. `PersistenceSession::persist` records items within the transaction
//! 3. `commit` or `rollback` consumes the session, which releases the
//!    underlying transaction on every exit path
//!
//! Sessions are acquired per invocation and never shared across items.

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::value_objects::pipeline_item::PipelineItem;

/// Factory for persistence sessions.
#[async_trait]
pub trait PersistenceManager: Send + Sync {
    /// Acquires a new session scoped by a transaction.
    async fn begin(&self) -> Result<Box<dyn PersistenceSession>, PipelineError>;
}

/// A transaction-scoped persistence session.
///
/// `commit` and `rollback` consume the session; dropping an unconsumed
/// session must release its transaction without committing.
#[async_trait]
pub trait PersistenceSession: Send {
    /// Persists one item on behalf of the named step.
    async fn persist(
        &mut self,
        step_name: &str,
        item: &PipelineItem,
    ) -> Result<(), PipelineError>;

    /// Commits the transaction and releases the session.
    async fn commit(self: Box<Self>) -> Result<(), PipelineError>;

    /// Rolls the transaction back and releases the session.
    async fn rollback(self: Box<Self>) -> Result<(), PipelineError>;
}
