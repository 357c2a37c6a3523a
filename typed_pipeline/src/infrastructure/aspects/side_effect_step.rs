// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Side-Effect Step
//!
//! The synthetic UNARY_UNARY step that aspect expansion inserts around
//! user steps. It is identity on the value stream: its emission is
//! structurally equal to its input. The wrapped observer may log, update
//! caches, or record metrics, but an observer failure never alters or
//! fails the observed stream; it is logged and the item passes through.

use async_trait::async_trait;
use std::sync::Arc;

use typed_pipeline_domain::services::observer::SideEffectObserver;
use typed_pipeline_domain::{PipelineError, PipelineItem, StepConfig, UnaryUnaryService};

/// Identity step dispatching to a side-effect observer.
pub struct SideEffectStep {
    service_name: String,
    observer: Arc<dyn SideEffectObserver>,
}

impl SideEffectStep {
    pub fn new(service_name: impl Into<String>, observer: Arc<dyn SideEffectObserver>) -> Self {
        Self {
            service_name: service_name.into(),
            observer,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

#[async_trait]
impl UnaryUnaryService for SideEffectStep {
    async fn apply(&self, item: PipelineItem) -> Result<PipelineItem, PipelineError> {
        if let Err(error) = self.observer.observe(&self.service_name, &item).await {
            tracing::warn!(
                service = %self.service_name,
                error = %error,
                "side-effect observer failed; item passes through unchanged"
            );
        }
        Ok(item)
    }

    fn initialise(&self, config: &StepConfig) {
        if config.debug() {
            tracing::debug!(service = %self.service_name, "side-effect step initialised");
        }
    }
}
