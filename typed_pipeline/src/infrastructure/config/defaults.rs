// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline-Wide Defaults
//!
//! Process-wide configuration knobs, loaded from an optional TOML file
//! overlaid with `TPF_`-prefixed environment variables
//! (`TPF_RETRY_LIMIT=3`, `TPF_PARALLELISM=SEQUENTIAL`, ...). Keys accept
//! both kebab-case (file) and snake_case (environment) spellings.
//!
//! Per-step manual configuration takes precedence over these defaults;
//! see `StepConfig::overlay_defaults`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use typed_pipeline_domain::{PipelineError, StepConfig};

use crate::infrastructure::runtime::backpressure::DEFAULT_BUFFER_CAPACITY;
use crate::infrastructure::runtime::parallelism::ParallelismPolicy;

/// Pipeline-wide default settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineDefaults {
    /// Per-item retry limit.
    #[serde(alias = "retry_limit")]
    pub retry_limit: u32,

    /// Base wait between retries, in milliseconds.
    #[serde(alias = "retry_wait_ms")]
    pub retry_wait_ms: u64,

    /// Backoff ceiling, in milliseconds.
    #[serde(alias = "max_backoff")]
    pub max_backoff: u64,

    /// Full jitter on backoff delays.
    pub jitter: bool,

    /// Pass-through salvage after retry exhaustion.
    #[serde(alias = "recover_on_failure")]
    pub recover_on_failure: bool,

    /// Automatic persistence in server adapters.
    #[serde(alias = "auto_persist")]
    pub auto_persist: bool,

    /// Dispatch step invocations on lightweight tasks.
    #[serde(alias = "run_with_virtual_threads")]
    pub run_with_virtual_threads: bool,

    /// Per-step debug logging.
    pub debug: bool,

    /// Pipeline-wide parallelism mode; `None` means the operator never
    /// chose one (constrained steps then fall back to sequential with a
    /// warning).
    pub parallelism: Option<ParallelismPolicy>,

    /// Capacity of the bounded buffers between stages.
    #[serde(alias = "buffer_capacity")]
    pub buffer_capacity: usize,

    /// Startup readiness deadline, in seconds.
    #[serde(alias = "startup_deadline_secs")]
    pub startup_deadline_secs: u64,

    /// Configured input document, the last-resort input source.
    pub input: Option<String>,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            retry_limit: 10,
            retry_wait_ms: 500,
            max_backoff: 30_000,
            jitter: false,
            recover_on_failure: false,
            auto_persist: true,
            run_with_virtual_threads: false,
            debug: false,
            parallelism: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            startup_deadline_secs: 120,
            input: None,
        }
    }
}

impl PipelineDefaults {
    /// Loads defaults from an optional TOML file overlaid with the
    /// process environment.
    ///
    /// # Errors
    /// `PipelineError::InvalidConfiguration` when the file or environment
    /// carries unreadable values.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TPF").try_parsing(true),
        );

        let loaded = builder.build().map_err(|e| {
            PipelineError::invalid_config(format!("Failed to load pipeline defaults: {}", e))
        })?;

        loaded.try_deserialize().map_err(|e| {
            PipelineError::invalid_config(format!("Invalid pipeline defaults: {}", e))
        })
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff)
    }

    pub fn startup_deadline(&self) -> Duration {
        Duration::from_secs(self.startup_deadline_secs)
    }

    /// Lowers the defaults onto a `StepConfig` (no manual overrides
    /// recorded).
    pub fn step_config(&self) -> StepConfig {
        StepConfig::from_pipeline_defaults(
            self.retry_limit,
            self.retry_wait(),
            self.max_backoff(),
            self.jitter,
            self.recover_on_failure,
            self.auto_persist,
            self.debug,
        )
    }
}
