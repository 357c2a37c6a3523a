// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Executor
//!
//! Loads registered steps in declared order, validates the type chain,
//! applies aspect expansion, resolves per-step configuration and
//! parallelism, and threads a stream of items through every stage.
//!
//! ## Assembly
//!
//! 1. Steps are ordered by their declared `StepOrder` (stable sort, so
//!    declaration order breaks ties).
//! 2. Aspect expansion interleaves synthetic observer steps.
//! 3. The type chain is validated across adjacent user steps; synthetic
//!    steps are identity on the value stream and are skipped.
//! 4. Each step's effective config overlays process-wide defaults with
//!    the step's manual overrides, then `initialise` runs once.
//! 5. The parallelism policy is resolved against each step's hints.
//!
//! ## Execution
//!
//! The run input is a stream (length one for unary orchestration). Each
//! stage adapts the stream to its shape: unary-input stages are invoked
//! once per element (with the retry/dead-letter/recovery engine around
//! every invocation), expansion outputs are flattened in source order or
//! merged when ordering is relaxed, and stream-input stages consume the
//! whole upstream once. Bounded backpressure buffers sit between stages,
//! keyed by the upstream step.
//!
//! Before any input is admitted, every remote client step must report
//! healthy (startup readiness). A cancellation from the run token
//! propagates upstream through every stage, buffers drain or drop, and
//! the final telemetry flush runs exactly once on every exit path.

use futures::stream::BoxStream;
use futures::{Future, StreamExt, TryStreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ulid::Ulid;

use typed_pipeline_bootstrap::shutdown::CancellationToken;
use typed_pipeline_domain::services::remote_transport::RemoteTransport;
use typed_pipeline_domain::value_objects::pipeline_step_model::PipelineStepModel;
use typed_pipeline_domain::{
    ExecutionMode, ItemStream, PipelineAspect, PipelineError, PipelineItem, Step, StepConfig,
    StepHandler, StreamingStreamingService, StreamingUnaryService, UnaryStreamingService,
    UnaryUnaryService,
};

use crate::infrastructure::aspects::expansion::{self, ObserverRegistry};
use crate::infrastructure::config::defaults::PipelineDefaults;
use crate::infrastructure::metrics::flush::TelemetryFlusher;
use crate::infrastructure::metrics::service::RpcMetricsService;
use crate::infrastructure::runtime::backpressure;
use crate::infrastructure::runtime::parallelism::{self, StepParallelism};
use crate::infrastructure::runtime::readiness::ReadinessGate;
use crate::infrastructure::runtime::retry::{self, ItemOutcome, RetryPolicy};
use crate::infrastructure::streams::stream_ext::PipelineStreamExt;

/// A step as registered at startup: declaration, implementation, and
/// optional manual config, type model, and remote transport binding.
#[derive(Clone)]
pub struct RegisteredStep {
    pub step: Step,
    pub handler: StepHandler,
    pub config: Option<StepConfig>,
    pub model: Option<PipelineStepModel>,
    pub transport: Option<Arc<dyn RemoteTransport>>,
}

impl std::fmt::Debug for RegisteredStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredStep")
            .field("step", &self.step)
            .field("handler", &self.handler)
            .field("config", &self.config)
            .field("model", &self.model)
            .field("transport", &self.transport.as_ref().map(|_| "<transport>"))
            .finish()
    }
}

impl RegisteredStep {
    /// Registers a local step with no type model.
    pub fn local(step: Step, handler: StepHandler) -> Self {
        Self {
            step,
            handler,
            config: None,
            model: None,
            transport: None,
        }
    }

    /// Attaches a manually-injected config (takes precedence over
    /// process-wide defaults).
    pub fn with_config(mut self, config: StepConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Attaches the compile-time type model.
    pub fn with_model(mut self, model: PipelineStepModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Marks the step remote, binding its transport for readiness checks.
    pub fn with_transport(mut self, transport: Arc<dyn RemoteTransport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

/// The explicit step registry the executor consumes.
///
/// Built at startup by the composition root (or generated manifest
/// loading); the executor never discovers steps reflectively.
#[derive(Default)]
pub struct StepRegistry {
    entries: Vec<RegisteredStep>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: RegisteredStep) -> &mut Self {
        self.entries.push(entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<RegisteredStep> {
        self.entries
    }
}

/// One stage after assembly: immutable step, effective config, resolved
/// parallelism.
#[derive(Debug, Clone)]
struct ResolvedStep {
    step: Step,
    handler: StepHandler,
    config: StepConfig,
    parallelism: StepParallelism,
}

/// Run-level accounting backing invariant checks and the final log line.
#[derive(Default)]
struct RunCounters {
    entered: AtomicU64,
    emitted: AtomicU64,
    dropped: AtomicU64,
    recovered: AtomicU64,
}

/// What one pipeline run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: String,
    /// Items admitted from the input source.
    pub entered: u64,
    /// Items emitted by the final stage.
    pub emitted: u64,
    /// Items consumed by dead-letter handlers without replacement.
    pub dropped: u64,
    /// Items salvaged by pass-through recovery.
    pub recovered: u64,
    pub elapsed: Duration,
}

/// The assembled, validated, aspect-expanded pipeline.
pub struct PipelineExecutor {
    stages: Vec<ResolvedStep>,
    clients: Vec<(String, Arc<dyn RemoteTransport>)>,
    buffer_capacity: usize,
    startup_deadline: Duration,
    metrics: Arc<RpcMetricsService>,
    flusher: Arc<TelemetryFlusher>,
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("stages", &self.stages)
            .field("clients", &self.clients.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("buffer_capacity", &self.buffer_capacity)
            .field("startup_deadline", &self.startup_deadline)
            .finish()
    }
}

impl PipelineExecutor {
    /// Assembles the pipeline from registered steps and aspects.
    ///
    /// # Errors
    /// `PipelineError::InvalidConfiguration` / `IncompatibleShape` on an
    /// empty registry, bad aspect declarations, unknown plugin classes or
    /// step references, a broken type chain, or a parallelism conflict.
    pub fn assemble(
        registry: StepRegistry,
        aspects: Vec<PipelineAspect>,
        observers: &ObserverRegistry,
        defaults: &PipelineDefaults,
        metrics: Arc<RpcMetricsService>,
        flusher: Arc<TelemetryFlusher>,
    ) -> Result<Self, PipelineError> {
        if registry.is_empty() {
            return Err(PipelineError::invalid_config(
                "Pipeline has no registered steps",
            ));
        }

        let mut entries = registry.into_entries();
        entries.sort_by_key(|entry| entry.step.order());

        let expanded = expansion::expand(entries, &aspects, observers)?;
        Self::validate_type_chain(&expanded)?;

        let defaults_config = defaults.step_config();
        let workers = parallelism::default_worker_count();
        let mut stages = Vec::with_capacity(expanded.len());
        let mut clients = Vec::new();

        for entry in expanded {
            let config = match entry.config {
                Some(mut manual) => {
                    manual.overlay_defaults(&defaults_config);
                    manual
                }
                None => defaults_config.clone(),
            };
            entry.handler.initialise(&config);

            let parallelism = parallelism::resolve(defaults.parallelism, &entry.step, workers)?;
            if let Some(transport) = entry.transport {
                clients.push((entry.step.name().to_string(), transport));
            }

            tracing::debug!(
                step = entry.step.name(),
                shape = %entry.step.shape(),
                parallelism = ?parallelism,
                "stage assembled"
            );

            stages.push(ResolvedStep {
                step: entry.step,
                handler: entry.handler,
                config,
                parallelism,
            });
        }

        Ok(Self {
            stages,
            clients,
            buffer_capacity: defaults.buffer_capacity,
            startup_deadline: defaults.startup_deadline(),
            metrics,
            flusher,
        })
    }

    /// Validates the domain type chain across adjacent user steps.
    ///
    /// Synthetic side-effect steps are identity on the value stream and
    /// do not participate.
    fn validate_type_chain(entries: &[RegisteredStep]) -> Result<(), PipelineError> {
        let user_steps: Vec<&RegisteredStep> =
            entries.iter().filter(|e| !e.step.is_side_effect()).collect();

        for pair in user_steps.windows(2) {
            let (Some(prev), Some(next)) = (pair[0].model.as_ref(), pair[1].model.as_ref()) else {
                continue;
            };
            if prev.output().domain_type() != next.input().domain_type() {
                return Err(PipelineError::IncompatibleShape(format!(
                    "Step '{}' outputs {} but step '{}' expects {}",
                    pair[0].step.name(),
                    prev.output().domain_type(),
                    pair[1].step.name(),
                    next.input().domain_type()
                )));
            }
        }
        Ok(())
    }

    /// Names of the assembled stages in execution order (synthetics
    /// included).
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.step.name()).collect()
    }

    /// Number of assembled stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs the pipeline over a vector of items, collecting the outputs.
    pub async fn execute_items(
        &self,
        items: Vec<PipelineItem>,
        token: CancellationToken,
    ) -> Result<(Vec<PipelineItem>, RunSummary), PipelineError> {
        let input: ItemStream = futures::stream::iter(items.into_iter().map(Ok)).boxed();
        self.execute_collect(input, token).await
    }

    /// Runs the pipeline to completion over an input stream.
    ///
    /// Waits for startup readiness before admitting input, threads the
    /// stream through every stage with buffers in between, and flushes
    /// telemetry on every exit path.
    pub async fn execute_collect(
        &self,
        input: ItemStream,
        token: CancellationToken,
    ) -> Result<(Vec<PipelineItem>, RunSummary), PipelineError> {
        let run_id = Ulid::new().to_string();
        let started = std::time::Instant::now();

        let gate = ReadinessGate::new(self.startup_deadline);
        if let Err(error) = gate.await_ready(&self.clients, &token).await {
            tracing::error!(run_id = %run_id, error = %error, "startup readiness failed");
            self.flusher.flush();
            return Err(error);
        }

        let counters = Arc::new(RunCounters::default());
        let ingress_counters = counters.clone();
        let mut acc: ItemStream = input
            .halt_on_cancel(token.clone())
            .inspect(move |item| {
                if item.is_ok() {
                    ingress_counters.entered.fetch_add(1, Ordering::Relaxed);
                }
            })
            .boxed();

        for (index, stage) in self.stages.iter().enumerate() {
            if index > 0 {
                let upstream_class = self.stages[index - 1].step.name();
                acc = backpressure::link(
                    acc,
                    self.buffer_capacity,
                    upstream_class,
                    self.metrics.clone(),
                    token.clone(),
                );
            }
            acc = apply_stage(stage, acc, counters.clone());
        }

        let mut outputs = Vec::new();
        let mut failure: Option<PipelineError> = None;
        while let Some(next) = acc.next().await {
            match next {
                Ok(item) => {
                    counters.emitted.fetch_add(1, Ordering::Relaxed);
                    outputs.push(item);
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        // Dropping the chain cancels upstream stages and releases their
        // buffers before the run is summarised.
        drop(acc);

        self.flusher.flush();

        let summary = RunSummary {
            run_id: run_id.clone(),
            entered: counters.entered.load(Ordering::Relaxed),
            emitted: counters.emitted.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
            recovered: counters.recovered.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        };

        match failure {
            Some(error) => {
                tracing::error!(
                    run_id = %run_id,
                    entered = summary.entered,
                    emitted = summary.emitted,
                    error = %error,
                    "pipeline run failed"
                );
                Err(error)
            }
            None => {
                tracing::info!(
                    run_id = %run_id,
                    entered = summary.entered,
                    emitted = summary.emitted,
                    dropped = summary.dropped,
                    recovered = summary.recovered,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "pipeline run completed"
                );
                Ok((outputs, summary))
            }
        }
    }
}

/// Threads the stream through one stage according to its shape.
fn apply_stage(stage: &ResolvedStep, input: ItemStream, counters: Arc<RunCounters>) -> ItemStream {
    match &stage.handler {
        StepHandler::UnaryUnary(service) => {
            apply_unary_unary(stage, service.clone(), input, counters)
        }
        StepHandler::UnaryStreaming(service) => {
            apply_unary_streaming(stage, service.clone(), input, counters)
        }
        StepHandler::StreamingUnary(service) => apply_streaming_unary(service.clone(), input),
        StepHandler::StreamingStreaming(service) => {
            apply_streaming_streaming(service.clone(), input)
        }
    }
}

/// Dispatches one invocation per the step's execution mode: inline on the
/// carrier, or on its own lightweight task for VIRTUAL_THREADS.
async fn run_dispatched<T, Fut>(mode: ExecutionMode, future: Fut) -> Result<T, PipelineError>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
{
    match mode {
        ExecutionMode::Default => future.await,
        ExecutionMode::VirtualThreads => match tokio::spawn(future).await {
            Ok(result) => result,
            Err(join_error) => Err(PipelineError::internal_error(format!(
                "dispatched invocation aborted: {join_error}"
            ))),
        },
    }
}

/// Applies the resolved concurrency to a per-element operation.
fn apply_concurrency<F, Fut, T>(
    input: ItemStream,
    parallelism: StepParallelism,
    run_one: F,
) -> BoxStream<'static, Result<T, PipelineError>>
where
    T: Send + 'static,
    F: FnMut(Result<PipelineItem, PipelineError>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
{
    match parallelism {
        StepParallelism::Sequential => input.then(run_one).boxed(),
        StepParallelism::Ordered(workers) => input.map(run_one).buffered(workers).boxed(),
        StepParallelism::Relaxed(workers) => input.map(run_one).buffer_unordered(workers).boxed(),
    }
}

/// Collapses per-item outcomes: dropped items disappear, failures become
/// the terminal element.
fn flatten_outcomes(
    stream: BoxStream<'static, Result<Option<PipelineItem>, PipelineError>>,
) -> ItemStream {
    stream
        .filter_map(|entry| async move {
            match entry {
                Ok(Some(item)) => Some(Ok(item)),
                Ok(None) => None,
                Err(error) => Some(Err(error)),
            }
        })
        .boxed()
}

/// Runs one item through a UNARY_UNARY step with the full
/// retry/dead-letter/recovery chain.
async fn run_unary_item(
    step_name: Arc<str>,
    config: StepConfig,
    service: Arc<dyn UnaryUnaryService>,
    item: PipelineItem,
    counters: Arc<RunCounters>,
) -> Result<Option<PipelineItem>, PipelineError> {
    let policy = RetryPolicy::from_config(&config);
    let result = retry::run_with_retry(&policy, &step_name, || {
        let service = service.clone();
        let attempt_item = item.clone();
        async move { service.apply(attempt_item).await }
    })
    .await;

    match result {
        Ok(output) => Ok(Some(output)),
        Err(cause) => {
            let dl_service = service.clone();
            let dead_letter = if service.has_dead_letter() {
                Some(move |failed, cause| async move { dl_service.dead_letter(failed, cause).await })
            } else {
                None
            };
            match retry::resolve_exhaustion(
                &step_name,
                item,
                cause,
                dead_letter,
                config.recover_on_failure(),
            )
            .await?
            {
                ItemOutcome::Emitted(item) => Ok(Some(item)),
                ItemOutcome::Recovered(item) => {
                    counters.recovered.fetch_add(1, Ordering::Relaxed);
                    Ok(Some(item))
                }
                ItemOutcome::Dropped => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    Ok(None)
                }
            }
        }
    }
}

fn apply_unary_unary(
    stage: &ResolvedStep,
    service: Arc<dyn UnaryUnaryService>,
    input: ItemStream,
    counters: Arc<RunCounters>,
) -> ItemStream {
    let step_name: Arc<str> = Arc::from(stage.step.name());
    let config = stage.config.clone();
    let mode = stage.step.execution_mode();

    let run_one = move |next: Result<PipelineItem, PipelineError>| {
        let service = service.clone();
        let config = config.clone();
        let step_name = step_name.clone();
        let counters = counters.clone();
        async move {
            match next {
                Err(error) => Err(error),
                Ok(item) => {
                    run_dispatched(
                        mode,
                        run_unary_item(step_name, config, service, item, counters),
                    )
                    .await
                }
            }
        }
    };

    flatten_outcomes(apply_concurrency(input, stage.parallelism, run_one))
}

/// Runs one item through a UNARY_STREAMING step; the invocation (not the
/// emitted stream) is retried, and exhaustion outcomes collapse to a
/// zero-or-one element stream.
async fn run_expansion_item(
    step_name: Arc<str>,
    config: StepConfig,
    service: Arc<dyn UnaryStreamingService>,
    item: PipelineItem,
    counters: Arc<RunCounters>,
) -> Result<ItemStream, PipelineError> {
    let policy = RetryPolicy::from_config(&config);
    let result = retry::run_with_retry(&policy, &step_name, || {
        let service = service.clone();
        let attempt_item = item.clone();
        async move { service.apply(attempt_item).await }
    })
    .await;

    match result {
        Ok(stream) => Ok(stream),
        Err(cause) => {
            let dl_service = service.clone();
            let dead_letter = if service.has_dead_letter() {
                Some(move |failed, cause| async move { dl_service.dead_letter(failed, cause).await })
            } else {
                None
            };
            match retry::resolve_exhaustion(
                &step_name,
                item,
                cause,
                dead_letter,
                config.recover_on_failure(),
            )
            .await?
            {
                ItemOutcome::Emitted(item) => {
                    Ok(futures::stream::iter([Ok(item)]).boxed())
                }
                ItemOutcome::Recovered(item) => {
                    counters.recovered.fetch_add(1, Ordering::Relaxed);
                    Ok(futures::stream::iter([Ok(item)]).boxed())
                }
                ItemOutcome::Dropped => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    Ok(futures::stream::empty().boxed())
                }
            }
        }
    }
}

fn apply_unary_streaming(
    stage: &ResolvedStep,
    service: Arc<dyn UnaryStreamingService>,
    input: ItemStream,
    counters: Arc<RunCounters>,
) -> ItemStream {
    let step_name: Arc<str> = Arc::from(stage.step.name());
    let config = stage.config.clone();
    let mode = stage.step.execution_mode();

    let run_one = move |next: Result<PipelineItem, PipelineError>| {
        let service = service.clone();
        let config = config.clone();
        let step_name = step_name.clone();
        let counters = counters.clone();
        async move {
            match next {
                Err(error) => Err(error),
                Ok(item) => {
                    run_dispatched(
                        mode,
                        run_expansion_item(step_name, config, service, item, counters),
                    )
                    .await
                }
            }
        }
    };

    // Emissions of each expansion concatenate in source order by default;
    // a relaxed stage merges them as they complete.
    match stage.parallelism {
        StepParallelism::Sequential => input.then(run_one).try_flatten().boxed(),
        StepParallelism::Ordered(workers) => {
            input.map(run_one).buffered(workers).try_flatten().boxed()
        }
        StepParallelism::Relaxed(workers) => input
            .map(run_one)
            .buffer_unordered(workers)
            .try_flatten_unordered(None)
            .boxed(),
    }
}

fn apply_streaming_unary(service: Arc<dyn StreamingUnaryService>, input: ItemStream) -> ItemStream {
    futures::stream::once(async move { service.apply(input).await }).boxed()
}

fn apply_streaming_streaming(
    service: Arc<dyn StreamingStreamingService>,
    input: ItemStream,
) -> ItemStream {
    futures::stream::once(async move { service.apply(input).await })
        .try_flatten()
        .boxed()
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "run {}: {} in, {} out, {} dropped, {} recovered in {:?}",
            self.run_id, self.entered, self.emitted, self.dropped, self.recovered, self.elapsed
        )
    }
}
