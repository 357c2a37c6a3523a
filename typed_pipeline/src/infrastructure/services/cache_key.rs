// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SHA-256 Cache Key Generator
//!
//! Derives a stable cache key from an item's payload document. Keys are
//! content-addressed: structurally equal payloads map to the same key
//! regardless of sequence number, which is what caching aspects want.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use typed_pipeline_domain::services::observer::{CacheKeyGenerator, SideEffectObserver};
use typed_pipeline_domain::{PipelineError, PipelineItem};

/// Registry key for the cache-key observer plugin.
pub const PLUGIN_CLASS: &str = "CacheKeyObserver";

/// Content-addressed cache key generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256CacheKeyGenerator;

impl Sha256CacheKeyGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl CacheKeyGenerator for Sha256CacheKeyGenerator {
    fn cache_key(&self, item: &PipelineItem) -> String {
        let mut hasher = Sha256::new();
        hasher.update(item.payload().to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Observer plugin backing caching aspects: derives each observed item's
/// cache key and reports it on the observation log. Cache lookups and
/// writes belong to the external cache sink; the pipeline only surfaces
/// the key.
pub struct CacheKeyObserver {
    generator: Arc<dyn CacheKeyGenerator>,
}

impl CacheKeyObserver {
    pub fn new(generator: Arc<dyn CacheKeyGenerator>) -> Self {
        Self { generator }
    }
}

impl Default for CacheKeyObserver {
    fn default() -> Self {
        Self::new(Arc::new(Sha256CacheKeyGenerator))
    }
}

#[async_trait]
impl SideEffectObserver for CacheKeyObserver {
    async fn observe(
        &self,
        service_name: &str,
        item: &PipelineItem,
    ) -> Result<(), PipelineError> {
        let key = self.generator.cache_key(item);
        tracing::debug!(service = service_name, item = %item, cache_key = %key, "derived cache key");
        Ok(())
    }
}
