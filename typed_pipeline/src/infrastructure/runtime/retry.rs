// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Retry, Dead-Letter & Recovery Engine
//!
//! Per-item failure handling applied at each stage:
//!
//! 1. On failure of the user function, retry up to `retry_limit` times
//!    with exponential backoff `min(retry_wait * 2^attempt, max_backoff)`;
//!    with jitter enabled, a uniform-random delay in `[0, delay)` is added
//!    on top.
//! 2. On exhaustion, a step-defined dead-letter handler is consulted: its
//!    return value (if any) is emitted downstream as normal, `None` drops
//!    the item, and a re-raise escalates.
//! 3. Otherwise, with `recover_on_failure`, the original input passes
//!    downstream unchanged (pass-through salvage).
//! 4. Otherwise the failure escalates to a terminal `PipelineFailure`.
//!
//! Retries apply to **per-item** invocations only. Stream-level terminal
//! failures are not retried by this engine; the caller reruns the
//! pipeline.
//!
//! Cancellation is never retried: a `Cancelled` outcome aborts the attempt
//! loop immediately so shutdown stays responsive mid-backoff.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use typed_pipeline_domain::{PipelineError, PipelineItem, StepConfig};

/// Exponential backoff policy with optional full jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    limit: u32,
    base_wait: Duration,
    max_backoff: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn new(limit: u32, base_wait: Duration, max_backoff: Duration, jitter: bool) -> Self {
        Self {
            limit,
            base_wait,
            max_backoff,
            jitter,
        }
    }

    /// Derives the policy from a step's effective configuration.
    pub fn from_config(config: &StepConfig) -> Self {
        Self {
            limit: config.retry_limit(),
            base_wait: config.retry_wait(),
            max_backoff: config.max_backoff(),
            jitter: config.jitter(),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO, false)
    }

    /// Maximum number of retries after the initial attempt.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Deterministic part of the delay before retry `attempt` (0-based).
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_wait.saturating_mul(factor).min(self.max_backoff)
    }

    /// Full delay before retry `attempt`, including jitter when enabled.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for(attempt);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let spread_ms = base.as_millis().max(1) as u64;
        let extra = rand::rng().random_range(0..spread_ms);
        base + Duration::from_millis(extra)
    }
}

/// Runs `op` with the retry policy, invoking it at most `limit + 1` times.
///
/// Cancellation short-circuits: a `Cancelled` result is returned without
/// further attempts and without sleeping.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    step_name: &str,
    op: F,
) -> Result<T, PipelineError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_cancellation() => return Err(error),
            Err(error) => {
                if attempt >= policy.limit() {
                    return Err(error);
                }
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    step = step_name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "step invocation failed, backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// What happened to one item after the full retry/dead-letter/recovery
/// chain ran.
#[derive(Debug)]
pub enum ItemOutcome {
    /// The item (or a value derived from it) continues downstream.
    Emitted(PipelineItem),
    /// Retries were exhausted and the original input passes through
    /// unchanged under the salvage policy.
    Recovered(PipelineItem),
    /// The dead-letter handler consumed the item without a replacement.
    Dropped,
}

/// Resolves an exhausted per-item failure against the step's dead-letter
/// handler and recovery policy.
///
/// `dead_letter` is `Some` only when the step actually defines a handler;
/// the chain is: dead-letter outcome is final if a handler exists, then
/// pass-through recovery, then escalation to `PipelineFailure`.
pub async fn resolve_exhaustion<D, Fut>(
    step_name: &str,
    item: PipelineItem,
    cause: PipelineError,
    dead_letter: Option<D>,
    recover_on_failure: bool,
) -> Result<ItemOutcome, PipelineError>
where
    D: FnOnce(PipelineItem, PipelineError) -> Fut,
    Fut: Future<Output = Result<Option<PipelineItem>, PipelineError>>,
{
    if cause.is_cancellation() {
        return Err(cause);
    }

    if let Some(handler) = dead_letter {
        return match handler(item, cause).await {
            Ok(Some(replacement)) => Ok(ItemOutcome::Emitted(replacement)),
            Ok(None) => {
                tracing::debug!(step = step_name, "dead-letter handler consumed item");
                Ok(ItemOutcome::Dropped)
            }
            Err(reraised) => Err(PipelineError::pipeline_failure(format!(
                "step '{}' dead-letter handler re-raised: {}",
                step_name, reraised
            ))),
        };
    }

    if recover_on_failure {
        tracing::warn!(
            step = step_name,
            error = %cause,
            "retries exhausted, passing original input downstream"
        );
        return Ok(ItemOutcome::Recovered(item));
    }

    Err(PipelineError::pipeline_failure(format!(
        "step '{}' exhausted retries: {}",
        step_name, cause
    )))
}
