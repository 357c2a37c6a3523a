// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Configuration
//!
//! Mutable per-instance runtime settings for a step: retry behaviour,
//! backoff bounds, recovery and persistence policies, and the debug flag.
//!
//! ## Configuration Precedence
//!
//! A manually-injected `StepConfig` takes precedence over
//! externally-supplied defaults. The rule is observation-based: the first
//! time a setter observes a non-default value it records that field as a
//! manual override, and every later [`StepConfig::overlay_defaults`] call
//! re-applies the override on top of the incoming defaults. Fields that
//! were never overridden track the process-wide defaults across
//! re-initialisations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Built-in default retry limit.
pub const DEFAULT_RETRY_LIMIT: u32 = 10;
/// Built-in default base wait between retries.
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_millis(500);
/// Built-in default backoff ceiling.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Tracks which fields were manually overridden at construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ManualOverrides {
    retry_limit: bool,
    retry_wait: bool,
    max_backoff: bool,
    jitter: bool,
    recover_on_failure: bool,
    auto_persist: bool,
    debug: bool,
}

/// Per-step runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    retry_limit: u32,
    retry_wait: Duration,
    max_backoff: Duration,
    jitter: bool,
    recover_on_failure: bool,
    auto_persist: bool,
    debug: bool,
    overrides: ManualOverrides,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_wait: DEFAULT_RETRY_WAIT,
            max_backoff: DEFAULT_MAX_BACKOFF,
            jitter: false,
            recover_on_failure: false,
            auto_persist: true,
            debug: false,
            overrides: ManualOverrides::default(),
        }
    }
}

impl StepConfig {
    /// Builds a config carrying process-wide defaults.
    ///
    /// Values set through this constructor are *defaults*, not manual
    /// overrides, regardless of whether they match the built-in values:
    /// a later `overlay_defaults` replaces them wholesale.
    #[allow(clippy::too_many_arguments)]
    pub fn from_pipeline_defaults(
        retry_limit: u32,
        retry_wait: Duration,
        max_backoff: Duration,
        jitter: bool,
        recover_on_failure: bool,
        auto_persist: bool,
        debug: bool,
    ) -> Self {
        Self {
            retry_limit,
            retry_wait,
            max_backoff,
            jitter,
            recover_on_failure,
            auto_persist,
            debug,
            overrides: ManualOverrides::default(),
        }
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn retry_wait(&self) -> Duration {
        self.retry_wait
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    pub fn jitter(&self) -> bool {
        self.jitter
    }

    pub fn recover_on_failure(&self) -> bool {
        self.recover_on_failure
    }

    pub fn auto_persist(&self) -> bool {
        self.auto_persist
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Sets the retry limit, recording a manual override on the first
    /// observation of a non-default value.
    pub fn set_retry_limit(&mut self, limit: u32) -> &mut Self {
        if limit != DEFAULT_RETRY_LIMIT {
            self.overrides.retry_limit = true;
        }
        self.retry_limit = limit;
        self
    }

    /// Sets the base retry wait, recording a manual override on the first
    /// observation of a non-default value.
    pub fn set_retry_wait(&mut self, wait: Duration) -> &mut Self {
        if wait != DEFAULT_RETRY_WAIT {
            self.overrides.retry_wait = true;
        }
        self.retry_wait = wait;
        self
    }

    /// Sets the backoff ceiling, recording a manual override on the first
    /// observation of a non-default value.
    pub fn set_max_backoff(&mut self, max: Duration) -> &mut Self {
        if max != DEFAULT_MAX_BACKOFF {
            self.overrides.max_backoff = true;
        }
        self.max_backoff = max;
        self
    }

    /// Enables or disables full jitter on backoff delays.
    pub fn set_jitter(&mut self, jitter: bool) -> &mut Self {
        if jitter {
            self.overrides.jitter = true;
        }
        self.jitter = jitter;
        self
    }

    /// Enables or disables pass-through recovery after retry exhaustion.
    pub fn set_recover_on_failure(&mut self, recover: bool) -> &mut Self {
        if recover {
            self.overrides.recover_on_failure = true;
        }
        self.recover_on_failure = recover;
        self
    }

    /// Enables or disables automatic persistence in server adapters.
    pub fn set_auto_persist(&mut self, auto_persist: bool) -> &mut Self {
        if !auto_persist {
            self.overrides.auto_persist = true;
        }
        self.auto_persist = auto_persist;
        self
    }

    /// Enables or disables per-step debug logging.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        if debug {
            self.overrides.debug = true;
        }
        self.debug = debug;
        self
    }

    /// Re-initialises the config from incoming process-wide defaults.
    ///
    /// Fields recorded as manual overrides keep their injected values;
    /// everything else adopts the defaults. Safe to call repeatedly.
    pub fn overlay_defaults(&mut self, defaults: &StepConfig) {
        if !self.overrides.retry_limit {
            self.retry_limit = defaults.retry_limit;
        }
        if !self.overrides.retry_wait {
            self.retry_wait = defaults.retry_wait;
        }
        if !self.overrides.max_backoff {
            self.max_backoff = defaults.max_backoff;
        }
        if !self.overrides.jitter {
            self.jitter = defaults.jitter;
        }
        if !self.overrides.recover_on_failure {
            self.recover_on_failure = defaults.recover_on_failure;
        }
        if !self.overrides.auto_persist {
            self.auto_persist = defaults.auto_persist;
        }
        if !self.overrides.debug {
            self.debug = defaults.debug;
        }
    }
}
