// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Item Store
//!
//! A `PersistenceManager` over process memory, with transaction
//! semantics: persisted items stage inside the session and only become
//! visible on commit. Used by unit tests and by pipelines that want
//! auto-persist bookkeeping without a database.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use typed_pipeline_domain::services::persistence::{PersistenceManager, PersistenceSession};
use typed_pipeline_domain::{PipelineError, PipelineItem};

/// Shared state behind the store and its sessions.
#[derive(Default)]
struct Shared {
    committed: Mutex<Vec<(String, PipelineItem)>>,
    rollbacks: AtomicU64,
    fail_persist: bool,
}

/// In-memory persistence manager.
#[derive(Clone, Default)]
pub struct MemoryItemStore {
    shared: Arc<Shared>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `persist` always fails; for rollback-path tests.
    pub fn failing() -> Self {
        Self {
            shared: Arc::new(Shared {
                fail_persist: true,
                ..Shared::default()
            }),
        }
    }

    /// Items visible after commit, in commit order.
    pub fn committed(&self) -> Vec<(String, PipelineItem)> {
        self.shared.committed.lock().clone()
    }

    /// Number of sessions that rolled back.
    pub fn rollbacks(&self) -> u64 {
        self.shared.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceManager for MemoryItemStore {
    async fn begin(&self) -> Result<Box<dyn PersistenceSession>, PipelineError> {
        Ok(Box::new(MemorySession {
            shared: self.shared.clone(),
            staged: Vec::new(),
        }))
    }
}

struct MemorySession {
    shared: Arc<Shared>,
    staged: Vec<(String, PipelineItem)>,
}

#[async_trait]
impl PersistenceSession for MemorySession {
    async fn persist(
        &mut self,
        step_name: &str,
        item: &PipelineItem,
    ) -> Result<(), PipelineError> {
        if self.shared.fail_persist {
            return Err(PipelineError::persistence("memory store configured to fail"));
        }
        self.staged.push((step_name.to_string(), item.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PipelineError> {
        self.shared.committed.lock().extend(self.staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PipelineError> {
        self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
