// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Typed Pipeline Domain
//!
//! Pure domain layer for the typed pipeline framework: the step model with
//! its four streaming shapes, per-step runtime configuration, aspect
//! descriptors, the value objects shared by every layer, and the service
//! ports the runtime implements (step contracts, persistence, remote
//! transport, side-effect observers).
//!
//! ## Architecture
//!
//! Following Domain-Driven Design and Clean Architecture principles:
//!
//! - **Entities**: `Step`, `StepConfig`, `PipelineAspect` - identity and
//!   mutable runtime settings
//! - **Value Objects**: `StepShape`, `StepOrder`, `PipelineItem`,
//!   `TypeMapping`, `PipelineStepModel` - immutable, validated values
//! - **Service Ports**: the four shape contracts plus persistence,
//!   transport, and observer traits implemented by the runtime crate
//! - **Errors**: the `PipelineError` taxonomy shared across all layers
//!
//! The domain crate carries no async runtime and no logging; ports that
//! describe I/O are async traits, everything else is synchronous business
//! logic.

pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

// Re-export commonly used types at the crate root
pub use entities::pipeline_aspect::{AspectPosition, AspectScope, PipelineAspect};
pub use entities::step::{ExecutionMode, OrderingHint, Step, StepRole, ThreadSafety};
pub use entities::step_config::StepConfig;
pub use error::{PipelineError, StatusCode};
pub use services::step_service::{
    ItemStream, StepHandler, StreamingStreamingService, StreamingUnaryService,
    UnaryStreamingService, UnaryUnaryService,
};
pub use value_objects::pipeline_item::PipelineItem;
pub use value_objects::step_shape::{Cardinality, StepShape};
