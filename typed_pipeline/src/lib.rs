// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Typed Pipeline Runtime
//!
//! The runtime crate of the typed pipeline framework: a reactive,
//! multi-stage streaming executor that composes typed processing steps
//! into an ordered pipeline, transports intermediate results across
//! in-process and remote stages, and enforces retry, dead-letter,
//! ordering, and backpressure policies end to end.
//!
//! ## Layers
//!
//! - **`application`** - the orchestrator use case: input resolution
//!   (CLI/env/stdin/config), JSON parsing, run driving, exit mapping
//! - **`infrastructure`** - everything the executor is made of: stream
//!   primitives, the executor itself, retry and backpressure engines,
//!   aspect expansion, server adapters and client steps, Prometheus
//!   telemetry, configuration loading, and persistence adapters
//!
//! ## Quick Tour
//!
//! ```rust,ignore
//! use typed_pipeline::infrastructure::runtime::executor::{PipelineExecutor, StepRegistry};
//!
//! let mut registry = StepRegistry::new();
//! registry.register(normalize_step);
//! registry.register(enrich_step);
//!
//! let executor = PipelineExecutor::assemble(registry, aspects, &observers, defaults, metrics, flusher)?;
//! let (outputs, summary) = executor.execute_collect(input_stream, token).await?;
//! ```

pub mod application;
pub mod infrastructure;

// Re-export the types most callers need
pub use infrastructure::aspects::expansion::ObserverRegistry;
pub use infrastructure::config::defaults::PipelineDefaults;
pub use infrastructure::metrics::flush::TelemetryFlusher;
pub use infrastructure::metrics::service::RpcMetricsService;
pub use infrastructure::runtime::executor::{
    PipelineExecutor, RegisteredStep, RunSummary, StepRegistry,
};
