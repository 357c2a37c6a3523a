// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Service Contracts
//!
//! The four streaming contracts that ALL pipeline steps implement, whether
//! they are local business logic, server adapters wrapping user functions,
//! or typed clients fronting remote endpoints. From the executor's
//! perspective every implementation is a black-box function; only the
//! shape determines how the run's stream is threaded through it.
//!
//! ## The Four Shapes
//!
//! | Contract | Input | Output | Typical use |
//! |----------|-------|--------|-------------|
//! | [`UnaryUnaryService`] | single item | single async item | pure transform |
//! | [`UnaryStreamingService`] | single item | async sequence | fan-out / expansion |
//! | [`StreamingUnaryService`] | async sequence | single async item | reduction |
//! | [`StreamingStreamingService`] | async sequence | async sequence | batch transform |
//!
//! ## Lifecycle Hooks
//!
//! Beyond its core `apply` function, every contract exposes:
//!
//! - `initialise(config)` - applied once before the first call, when the
//!   executor resolves the step's effective configuration
//! - `dead_letter(item, cause)` - optional terminal-per-item handler
//!   invoked after retries are exhausted; returning `Ok(Some(v))` emits
//!   `v` downstream, `Ok(None)` drops the item, and `Err` escalates.
//!   Implementations that provide a handler must also override
//!   `has_dead_letter` so the retry engine knows to call it.
//!
//! Dead-letter hooks exist on the unary-input contracts only: those are
//! the shapes the executor invokes once per item, so a failed input is
//! still in hand to salvage. Stream-input stages are invoked once per run
//! and their terminal failures propagate (replay is a non-goal).
//!
//! ## Stream Convention
//!
//! An [`ItemStream`] yields `Result<PipelineItem, PipelineError>` where an
//! `Err` element is the stream's terminal failure: consumers stop at the
//! first `Err`, so a stream emits zero or more `Ok` values followed by at
//! most one `Err`.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

use crate::entities::step_config::StepConfig;
use crate::error::PipelineError;
use crate::value_objects::pipeline_item::PipelineItem;
use crate::value_objects::step_shape::StepShape;

/// A lazy asynchronous sequence of pipeline items with at most one
/// terminal failure.
pub type ItemStream = BoxStream<'static, Result<PipelineItem, PipelineError>>;

/// Single value in, single asynchronous value out.
#[async_trait]
pub trait UnaryUnaryService: Send + Sync {
    /// Applies the step's transformation to one item.
    async fn apply(&self, item: PipelineItem) -> Result<PipelineItem, PipelineError>;

    /// Applied once before the first call with the step's effective
    /// configuration.
    fn initialise(&self, _config: &StepConfig) {}

    /// Whether this step defines a dead-letter handler.
    fn has_dead_letter(&self) -> bool {
        false
    }

    /// Terminal-per-item handler invoked when retries are exhausted.
    async fn dead_letter(
        &self,
        _item: PipelineItem,
        cause: PipelineError,
    ) -> Result<Option<PipelineItem>, PipelineError> {
        Err(cause)
    }
}

/// Single value in, asynchronous sequence out.
#[async_trait]
pub trait UnaryStreamingService: Send + Sync {
    /// Expands one item into a stream of items.
    async fn apply(&self, item: PipelineItem) -> Result<ItemStream, PipelineError>;

    /// Applied once before the first call with the step's effective
    /// configuration.
    fn initialise(&self, _config: &StepConfig) {}

    /// Whether this step defines a dead-letter handler.
    fn has_dead_letter(&self) -> bool {
        false
    }

    /// Terminal-per-item handler invoked when retries are exhausted.
    async fn dead_letter(
        &self,
        _item: PipelineItem,
        cause: PipelineError,
    ) -> Result<Option<PipelineItem>, PipelineError> {
        Err(cause)
    }
}

/// Asynchronous sequence in, single asynchronous value out (aggregation).
#[async_trait]
pub trait StreamingUnaryService: Send + Sync {
    /// Reduces the input stream to a single item.
    async fn apply(&self, items: ItemStream) -> Result<PipelineItem, PipelineError>;

    /// Applied once before the first call with the step's effective
    /// configuration.
    fn initialise(&self, _config: &StepConfig) {}
}

/// Asynchronous sequence in, asynchronous sequence out.
#[async_trait]
pub trait StreamingStreamingService: Send + Sync {
    /// Transforms the input stream into an output stream.
    async fn apply(&self, items: ItemStream) -> Result<ItemStream, PipelineError>;

    /// Applied once before the first call with the step's effective
    /// configuration.
    fn initialise(&self, _config: &StepConfig) {}
}

/// Shape-tagged handle to a step implementation.
///
/// The executor stores one handler per resolved step and dispatches on
/// the shape when threading the run's stream through the stage.
#[derive(Clone)]
pub enum StepHandler {
    UnaryUnary(Arc<dyn UnaryUnaryService>),
    UnaryStreaming(Arc<dyn UnaryStreamingService>),
    StreamingUnary(Arc<dyn StreamingUnaryService>),
    StreamingStreaming(Arc<dyn StreamingStreamingService>),
}

impl StepHandler {
    /// The shape this handler implements.
    pub fn shape(&self) -> StepShape {
        match self {
            StepHandler::UnaryUnary(_) => StepShape::UnaryUnary,
            StepHandler::UnaryStreaming(_) => StepShape::UnaryStreaming,
            StepHandler::StreamingUnary(_) => StepShape::StreamingUnary,
            StepHandler::StreamingStreaming(_) => StepShape::StreamingStreaming,
        }
    }

    /// Forwards the one-time initialisation hook to the implementation.
    pub fn initialise(&self, config: &StepConfig) {
        match self {
            StepHandler::UnaryUnary(s) => s.initialise(config),
            StepHandler::UnaryStreaming(s) => s.initialise(config),
            StepHandler::StreamingUnary(s) => s.initialise(config),
            StepHandler::StreamingStreaming(s) => s.initialise(config),
        }
    }
}

impl std::fmt::Debug for StepHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StepHandler({})", self.shape())
    }
}
