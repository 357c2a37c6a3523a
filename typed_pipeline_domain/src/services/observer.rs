// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Observer and Cache Ports
//!
//! Plugin contracts behind the aspect system. Aspect expansion resolves
//! each declared `pluginImplementationClass` to a [`SideEffectObserver`]
//! and wires it into a synthetic identity step. Observers see every item
//! that passes their position but can never alter the value stream.
//!
//! [`CacheKeyGenerator`] supports caching aspects: it derives a stable key
//! from an item. A step-level generator declaration overrides the
//! pipeline-level one.

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::value_objects::pipeline_item::PipelineItem;

/// Observation hook dispatched by synthetic side-effect steps.
#[async_trait]
pub trait SideEffectObserver: Send + Sync {
    /// Observes one item passing the synthetic step.
    ///
    /// `service_name` is the synthetic step's identity (which encodes the
    /// aspect and the observed message type). Failures are recorded but
    /// never alter or fail the observed stream.
    async fn observe(
        &self,
        service_name: &str,
        item: &PipelineItem,
    ) -> Result<(), PipelineError>;
}

/// Derives a stable cache key from an item.
pub trait CacheKeyGenerator: Send + Sync {
    fn cache_key(&self, item: &PipelineItem) -> String;
}
