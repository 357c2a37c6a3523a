// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Passthrough Step
//!
//! Identity UNARY_UNARY step. Useful as a placeholder while wiring a
//! topology, as the default handler for declared-but-unimplemented steps,
//! and in tests that exercise the executor's plumbing rather than
//! business logic.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

use typed_pipeline_domain::{
    ItemStream, PipelineError, PipelineItem, StepConfig, StepHandler, StepShape,
    StreamingStreamingService, StreamingUnaryService, UnaryStreamingService, UnaryUnaryService,
};

/// Identity step: emits its input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughStep;

impl PassthroughStep {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UnaryUnaryService for PassthroughStep {
    async fn apply(&self, item: PipelineItem) -> Result<PipelineItem, PipelineError> {
        Ok(item)
    }

    fn initialise(&self, config: &StepConfig) {
        if config.debug() {
            tracing::debug!("passthrough step initialised");
        }
    }
}

/// Identity expansion: wraps the input as a one-element stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingletonExpansion;

#[async_trait]
impl UnaryStreamingService for SingletonExpansion {
    async fn apply(&self, item: PipelineItem) -> Result<ItemStream, PipelineError> {
        Ok(futures::stream::iter([Ok(item)]).boxed())
    }
}

/// Placeholder reduction: emits the last upstream item, or fails on an
/// empty stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct LastValueReduction;

#[async_trait]
impl StreamingUnaryService for LastValueReduction {
    async fn apply(&self, mut items: ItemStream) -> Result<PipelineItem, PipelineError> {
        let mut last = None;
        while let Some(next) = items.next().await {
            last = Some(next?);
        }
        last.ok_or_else(|| PipelineError::transient("reduction received an empty stream"))
    }
}

/// Identity stream transform.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamPassthrough;

#[async_trait]
impl StreamingStreamingService for StreamPassthrough {
    async fn apply(&self, items: ItemStream) -> Result<ItemStream, PipelineError> {
        Ok(items)
    }
}

/// The placeholder handler for a declared-but-unimplemented step of the
/// given shape.
pub fn default_handler_for(shape: StepShape) -> StepHandler {
    match shape {
        StepShape::UnaryUnary => StepHandler::UnaryUnary(Arc::new(PassthroughStep)),
        StepShape::UnaryStreaming => StepHandler::UnaryStreaming(Arc::new(SingletonExpansion)),
        StepShape::StreamingUnary => StepHandler::StreamingUnary(Arc::new(LastValueReduction)),
        StepShape::StreamingStreaming => {
            StepHandler::StreamingStreaming(Arc::new(StreamPassthrough))
        }
    }
}
