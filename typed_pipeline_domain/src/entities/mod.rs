// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain entities for the typed pipeline framework.

pub mod pipeline_aspect;
pub mod step;
pub mod step_config;

pub use pipeline_aspect::{AspectPosition, AspectScope, PipelineAspect};
pub use step::{ExecutionMode, OrderingHint, Step, StepId, StepRole, ThreadSafety};
pub use step_config::StepConfig;
