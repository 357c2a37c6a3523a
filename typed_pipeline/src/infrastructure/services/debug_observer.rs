// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Debug Observer
//!
//! The built-in logging observer plugin. Declared in aspect configs as
//! `pluginImplementationClass: DebugObserver`, it logs every item passing
//! its synthetic step with a truncated payload preview.

use async_trait::async_trait;

use typed_pipeline_domain::services::observer::SideEffectObserver;
use typed_pipeline_domain::{PipelineError, PipelineItem};

/// Registry key for this plugin.
pub const PLUGIN_CLASS: &str = "DebugObserver";

/// Longest payload preview the observer logs.
const PREVIEW_LIMIT: usize = 256;

/// Logging observer plugin.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugObserver;

impl DebugObserver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SideEffectObserver for DebugObserver {
    async fn observe(
        &self,
        service_name: &str,
        item: &PipelineItem,
    ) -> Result<(), PipelineError> {
        let rendered = item.payload().to_string();
        let preview: String = rendered.chars().take(PREVIEW_LIMIT).collect();
        tracing::info!(
            service = service_name,
            item = %item,
            payload = %preview,
            "observed item"
        );
        Ok(())
    }
}
