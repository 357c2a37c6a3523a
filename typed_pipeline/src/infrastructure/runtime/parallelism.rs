// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Parallelism Policy
//!
//! Resolves the pipeline-wide parallelism mode against each step's
//! ordering and thread-safety hints, at assembly time.
//!
//! ## Decision Table
//!
//! | ordering \ safety | SAFE | UNSAFE |
//! |---|---|---|
//! | RELAXED | AUTO/PARALLEL -> relaxed parallel, SEQUENTIAL -> sequential | any non-SEQUENTIAL -> error |
//! | STRICT_ADVISED | AUTO -> sequential (warn), PARALLEL -> ordered parallel (warn), SEQUENTIAL -> sequential | any non-SEQUENTIAL -> error |
//! | STRICT_REQUIRED | any non-SEQUENTIAL -> error | any non-SEQUENTIAL -> error |
//!
//! When no policy was chosen and a step carries STRICT_* or UNSAFE hints,
//! the resolver falls back to sequential for that step and emits a
//! startup warning naming the step and its hints; the error rows of the
//! table apply only to an explicitly chosen policy.
//!
//! "Ordered parallel" maps onto `futures` `buffered(n)` (concurrent
//! execution, emission in input order); "relaxed parallel" maps onto
//! `buffer_unordered(n)`.

use serde::{Deserialize, Serialize};

use typed_pipeline_domain::{OrderingHint, PipelineError, Step, ThreadSafety};

/// Pipeline-wide parallelism mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParallelismPolicy {
    Sequential,
    Auto,
    Parallel,
}

/// Effective per-step concurrency after policy resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepParallelism {
    /// One item in flight at a time.
    Sequential,
    /// Up to `n` items in flight; emission preserves input order.
    Ordered(usize),
    /// Up to `n` items in flight; emission order follows completion.
    Relaxed(usize),
}

impl StepParallelism {
    /// Whether more than one item may be in flight.
    pub fn is_concurrent(&self) -> bool {
        !matches!(self, StepParallelism::Sequential)
    }
}

/// Worker count used for parallel stages: available cores minus one for
/// the runtime itself, floor of one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .saturating_sub(1)
        .max(1)
}

/// Resolves the effective concurrency for one step.
///
/// `policy` is `None` when the operator never chose a mode; `workers`
/// bounds in-flight items for parallel resolutions.
///
/// # Errors
/// Returns `PipelineError::InvalidConfiguration` naming the step and its
/// hints when an explicitly chosen non-sequential policy conflicts with
/// `STRICT_REQUIRED` ordering or `UNSAFE` thread safety.
pub fn resolve(
    policy: Option<ParallelismPolicy>,
    step: &Step,
    workers: usize,
) -> Result<StepParallelism, PipelineError> {
    let workers = workers.max(1);
    let ordering = step.ordering();
    let safety = step.thread_safety();

    let Some(policy) = policy else {
        // Unset policy: constrained steps run sequentially with a startup
        // warning; unconstrained steps get the AUTO behaviour.
        if ordering != OrderingHint::Relaxed || safety == ThreadSafety::Unsafe {
            tracing::warn!(
                step = step.name(),
                ordering = ?ordering,
                thread_safety = ?safety,
                "parallelism policy is unset; running step sequentially"
            );
            return Ok(StepParallelism::Sequential);
        }
        return Ok(StepParallelism::Relaxed(workers));
    };

    if policy == ParallelismPolicy::Sequential {
        return Ok(StepParallelism::Sequential);
    }

    // Non-sequential policy below.
    if safety == ThreadSafety::Unsafe {
        return Err(conflict(step, policy, "the step is declared UNSAFE"));
    }

    match ordering {
        OrderingHint::Relaxed => Ok(StepParallelism::Relaxed(workers)),
        OrderingHint::StrictAdvised => match policy {
            ParallelismPolicy::Auto => {
                tracing::warn!(
                    step = step.name(),
                    "STRICT_ADVISED ordering downgrades AUTO parallelism to sequential"
                );
                Ok(StepParallelism::Sequential)
            }
            ParallelismPolicy::Parallel => {
                tracing::warn!(
                    step = step.name(),
                    "running a STRICT_ADVISED step in parallel; order is preserved by a reorder boundary"
                );
                Ok(StepParallelism::Ordered(workers))
            }
            ParallelismPolicy::Sequential => Ok(StepParallelism::Sequential),
        },
        OrderingHint::StrictRequired => Err(conflict(
            step,
            policy,
            "the step requires strict ordering (STRICT_REQUIRED)",
        )),
    }
}

fn conflict(step: &Step, policy: ParallelismPolicy, reason: &str) -> PipelineError {
    PipelineError::InvalidConfiguration(format!(
        "Parallelism policy {:?} is invalid for step '{}' (ordering {:?}, thread safety {:?}): {}",
        policy,
        step.name(),
        step.ordering(),
        step.thread_safety(),
        reason
    ))
}
