// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Entity
//!
//! The atomic processing unit of a pipeline. A `Step` carries the
//! declaration-time attributes the executor needs to place it in a run:
//! a stable name, an execution order, a streaming shape, dispatch and
//! ordering hints, and the side-effect marker that distinguishes synthetic
//! observer steps from user steps.
//!
//! ## Entity Characteristics
//!
//! - **Identity**: unique `StepId` that persists through configuration
//!   changes
//! - **Ordering**: explicit `StepOrder` with declaration-order tiebreak
//! - **Immutability**: constructed once at pipeline assembly and immutable
//!   for the pipeline's lifetime; per-run settings live in `StepConfig`
//!
//! ## Hints and the Parallelism Policy
//!
//! `ordering` and `thread_safety` are promises the step author makes about
//! the step's implementation. The executor's parallelism policy resolves
//! the pipeline-wide mode against these hints at assembly time: a step
//! declared `UNSAFE` is never invoked concurrently, and a step declared
//! `STRICT_REQUIRED` never has its output order relaxed. See the runtime
//! crate's parallelism module for the full decision table.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use ulid::Ulid;

use crate::value_objects::step_order::StepOrder;
use crate::value_objects::step_shape::StepShape;
use crate::PipelineError;

/// Unique identifier for a step instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(Ulid);

impl StepId {
    /// Generates a new unique step id.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dispatch hint for a step's invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// Run on the carrier worker driving the stage.
    #[default]
    Default,
    /// Dispatch each invocation onto its own lightweight task.
    VirtualThreads,
}

/// Code-generation role label. The executor treats all roles as black-box
/// functions; the role only selects which stubs the generator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepRole {
    #[default]
    PipelineServer,
    OrchestratorClient,
    PluginServer,
    PluginClient,
    RestServer,
}

/// How strongly the step depends on observing items in input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderingHint {
    /// Outputs may be reordered relative to inputs.
    #[default]
    Relaxed,
    /// Order should be preserved; relaxing it is allowed with a warning.
    StrictAdvised,
    /// Order must be preserved; any parallel mode is a configuration error.
    StrictRequired,
}

/// Whether the step may be invoked concurrently on distinct items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadSafety {
    #[default]
    Safe,
    Unsafe,
}

/// Core step entity: the declaration-time description of one processing
/// unit in a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    id: StepId,
    name: String,
    order: StepOrder,
    shape: StepShape,
    execution_mode: ExecutionMode,
    role: StepRole,
    ordering: OrderingHint,
    thread_safety: ThreadSafety,
    side_effect: bool,
    cache_key_generator: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl Step {
    /// Creates a new user step with default hints.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidConfiguration` when the name is
    /// empty.
    pub fn new(
        name: impl Into<String>,
        order: StepOrder,
        shape: StepShape,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        if name.is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "Step name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id: StepId::new(),
            name,
            order,
            shape,
            execution_mode: ExecutionMode::default(),
            role: StepRole::default(),
            ordering: OrderingHint::default(),
            thread_safety: ThreadSafety::default(),
            side_effect: false,
            cache_key_generator: None,
            created_at: chrono::Utc::now(),
        })
    }

    /// Creates a synthetic side-effect observer step.
    ///
    /// Synthetic steps are always UNARY_UNARY, identity on the value
    /// stream, and inherit the order of the user step they observe.
    pub fn side_effect(name: impl Into<String>, order: StepOrder) -> Result<Self, PipelineError> {
        let mut step = Self::new(name, order, StepShape::UnaryUnary)?;
        step.side_effect = true;
        Ok(step)
    }

    /// Sets the dispatch hint.
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    /// Sets the code-generation role.
    pub fn with_role(mut self, role: StepRole) -> Self {
        self.role = role;
        self
    }

    /// Sets the ordering hint.
    pub fn with_ordering(mut self, ordering: OrderingHint) -> Self {
        self.ordering = ordering;
        self
    }

    /// Sets the thread-safety hint.
    pub fn with_thread_safety(mut self, thread_safety: ThreadSafety) -> Self {
        self.thread_safety = thread_safety;
        self
    }

    /// Sets the step-level cache key generator identity.
    pub fn with_cache_key_generator(mut self, generator: impl Into<String>) -> Self {
        self.cache_key_generator = Some(generator.into());
        self
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> StepOrder {
        self.order
    }

    pub fn shape(&self) -> StepShape {
        self.shape
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    pub fn role(&self) -> StepRole {
        self.role
    }

    pub fn ordering(&self) -> OrderingHint {
        self.ordering
    }

    pub fn thread_safety(&self) -> ThreadSafety {
        self.thread_safety
    }

    /// Whether this is a synthetic observer/cache step that must be
    /// identity on the value stream.
    pub fn is_side_effect(&self) -> bool {
        self.side_effect
    }

    pub fn cache_key_generator(&self) -> Option<&str> {
        self.cache_key_generator.as_deref()
    }

    /// Resolves the cache key generator for this step: a step-level
    /// declaration overrides the pipeline-level one.
    pub fn effective_cache_key_generator<'a>(
        &'a self,
        pipeline_level: Option<&'a str>,
    ) -> Option<&'a str> {
        self.cache_key_generator.as_deref().or(pipeline_level)
    }

    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (order {}, {})", self.name, self.order, self.shape)
    }
}
