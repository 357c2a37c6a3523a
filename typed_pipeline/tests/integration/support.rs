// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared helpers for the integration suite: step doubles, observer
//! doubles, transport doubles, and assembly shortcuts.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use typed_pipeline::infrastructure::aspects::expansion::ObserverRegistry;
use typed_pipeline::infrastructure::config::defaults::PipelineDefaults;
use typed_pipeline::infrastructure::metrics::flush::TelemetryFlusher;
use typed_pipeline::infrastructure::metrics::service::RpcMetricsService;
use typed_pipeline::infrastructure::runtime::executor::{
    PipelineExecutor, RegisteredStep, StepRegistry,
};
use typed_pipeline_domain::services::observer::SideEffectObserver;
use typed_pipeline_domain::services::remote_transport::RemoteTransport;
use typed_pipeline_domain::value_objects::pipeline_step_model::PipelineStepModel;
use typed_pipeline_domain::value_objects::step_order::StepOrder;
use typed_pipeline_domain::value_objects::type_mapping::TypeMapping;
use typed_pipeline_domain::{
    ItemStream, PipelineError, PipelineItem, Step, StepConfig, StepHandler, StepShape,
    UnaryStreamingService, UnaryUnaryService,
};

pub fn metrics() -> Arc<RpcMetricsService> {
    Arc::new(RpcMetricsService::new().expect("metrics registry"))
}

pub fn flusher(metrics: &Arc<RpcMetricsService>) -> Arc<TelemetryFlusher> {
    Arc::new(TelemetryFlusher::new(metrics.clone()))
}

/// Defaults tuned for test speed and determinism: millisecond backoffs,
/// short startup deadline, sequential stages (tests that exercise
/// concurrency override the policy explicitly).
pub fn fast_defaults() -> PipelineDefaults {
    let mut defaults = PipelineDefaults::default();
    defaults.retry_wait_ms = 1;
    defaults.max_backoff = 4;
    defaults.startup_deadline_secs = 1;
    defaults.parallelism =
        Some(typed_pipeline::infrastructure::runtime::parallelism::ParallelismPolicy::Sequential);
    defaults
}

pub fn step(name: &str, order: u32, shape: StepShape) -> Step {
    Step::new(name, StepOrder::new(order).expect("positive order"), shape).expect("valid step")
}

/// Identity model typed `domain_type` on both sides.
pub fn identity_model(service_name: &str, input_type: &str, output_type: &str) -> PipelineStepModel {
    PipelineStepModel::new(
        service_name,
        "com.acme.test",
        TypeMapping::identity(input_type),
        TypeMapping::identity(output_type),
        StepShape::UnaryUnary,
        Vec::new(),
    )
    .expect("valid model")
}

pub fn items(values: Vec<Value>) -> Vec<PipelineItem> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| PipelineItem::new(index as u64, value))
        .collect()
}

/// Assembles an executor with fresh telemetry, returning the metrics
/// handle for gauge assertions.
pub fn assemble(
    entries: Vec<RegisteredStep>,
    aspects: Vec<typed_pipeline_domain::PipelineAspect>,
    observers: &ObserverRegistry,
    defaults: &PipelineDefaults,
) -> (PipelineExecutor, Arc<RpcMetricsService>) {
    let metrics = metrics();
    let flusher = flusher(&metrics);
    let mut registry = StepRegistry::new();
    for entry in entries {
        registry.register(entry);
    }
    let executor = PipelineExecutor::assemble(
        registry,
        aspects,
        observers,
        defaults,
        metrics.clone(),
        flusher,
    )
    .expect("assembly");
    (executor, metrics)
}

/// A step that fails its first `fail_times` invocations, then succeeds by
/// tagging the payload.
pub struct FlakyStep {
    fail_times: u32,
    calls: AtomicU32,
}

impl FlakyStep {
    pub fn new(fail_times: u32) -> Arc<Self> {
        Arc::new(Self {
            fail_times,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnaryUnaryService for FlakyStep {
    async fn apply(&self, item: PipelineItem) -> Result<PipelineItem, PipelineError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_times {
            Err(PipelineError::transient(format!("attempt {attempt} failed")))
        } else {
            let tagged = format!(
                "{}:attempt-{}",
                item.payload().as_str().unwrap_or_default(),
                attempt
            );
            Ok(item.with_payload(json!(tagged)))
        }
    }
}

/// A step that fails every invocation.
pub struct AlwaysFailsStep {
    calls: AtomicU32,
}

impl AlwaysFailsStep {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnaryUnaryService for AlwaysFailsStep {
    async fn apply(&self, _item: PipelineItem) -> Result<PipelineItem, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PipelineError::transient("permanently broken"))
    }
}

/// Fails items with odd numeric payloads; the dead-letter handler
/// consumes them without replacement.
pub struct OddDropStep;

#[async_trait]
impl UnaryUnaryService for OddDropStep {
    async fn apply(&self, item: PipelineItem) -> Result<PipelineItem, PipelineError> {
        match item.payload().as_i64() {
            Some(n) if n % 2 != 0 => Err(PipelineError::transient("odd payload")),
            _ => Ok(item),
        }
    }

    fn has_dead_letter(&self) -> bool {
        true
    }

    async fn dead_letter(
        &self,
        _item: PipelineItem,
        _cause: PipelineError,
    ) -> Result<Option<PipelineItem>, PipelineError> {
        Ok(None)
    }
}

/// Always fails; the dead-letter handler replaces the item.
pub struct SalvageStep;

#[async_trait]
impl UnaryUnaryService for SalvageStep {
    async fn apply(&self, _item: PipelineItem) -> Result<PipelineItem, PipelineError> {
        Err(PipelineError::transient("needs salvage"))
    }

    fn has_dead_letter(&self) -> bool {
        true
    }

    async fn dead_letter(
        &self,
        item: PipelineItem,
        _cause: PipelineError,
    ) -> Result<Option<PipelineItem>, PipelineError> {
        Ok(Some(item.with_payload(json!("salvaged"))))
    }
}

/// Expansion step: numeric payload `n` fans out to `n-1`, `n-2`, `n-3`.
pub struct ExpanderStep;

#[async_trait]
impl UnaryStreamingService for ExpanderStep {
    async fn apply(&self, item: PipelineItem) -> Result<ItemStream, PipelineError> {
        let base = item.payload().as_i64().unwrap_or_default();
        let children: Vec<_> = (1..=3)
            .map(|i| Ok(item.child(i, json!(format!("{base}-{i}")))))
            .collect();
        Ok(futures::stream::iter(children).boxed())
    }
}

/// Records payload order while passing items through, with an optional
/// per-item delay derived from the sequence number.
pub struct RecordingStep {
    pub seen: Mutex<Vec<Value>>,
    pub delay_for: fn(&PipelineItem) -> std::time::Duration,
}

impl RecordingStep {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            delay_for: |_| std::time::Duration::ZERO,
        })
    }

    pub fn with_delay(delay_for: fn(&PipelineItem) -> std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            delay_for,
        })
    }

    pub fn seen(&self) -> Vec<Value> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl UnaryUnaryService for RecordingStep {
    async fn apply(&self, item: PipelineItem) -> Result<PipelineItem, PipelineError> {
        let delay = (self.delay_for)(&item);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.seen.lock().push(item.payload().clone());
        Ok(item)
    }
}

/// Observer double recording `(service_name, sequence)` pairs.
pub struct TagObserver {
    pub seen: Mutex<Vec<(String, u64)>>,
}

impl TagObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<(String, u64)> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl SideEffectObserver for TagObserver {
    async fn observe(
        &self,
        service_name: &str,
        item: &PipelineItem,
    ) -> Result<(), PipelineError> {
        self.seen
            .lock()
            .push((service_name.to_string(), item.sequence()));
        Ok(())
    }
}

/// Transport double whose health is fixed; calls echo.
pub struct FixedHealthTransport {
    healthy: bool,
}

impl FixedHealthTransport {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self { healthy: true })
    }

    pub fn unhealthy() -> Arc<Self> {
        Arc::new(Self { healthy: false })
    }
}

#[async_trait]
impl RemoteTransport for FixedHealthTransport {
    fn service_name(&self) -> &str {
        "FixedHealthService"
    }

    async fn call_unary(
        &self,
        _method: &str,
        item: PipelineItem,
    ) -> Result<PipelineItem, PipelineError> {
        Ok(item)
    }

    async fn call_server_streaming(
        &self,
        _method: &str,
        item: PipelineItem,
    ) -> Result<ItemStream, PipelineError> {
        Ok(futures::stream::iter([Ok(item)]).boxed())
    }

    async fn call_client_streaming(
        &self,
        _method: &str,
        mut items: ItemStream,
    ) -> Result<PipelineItem, PipelineError> {
        let mut last = None;
        while let Some(next) = items.next().await {
            last = Some(next?);
        }
        last.ok_or_else(|| PipelineError::transient("empty stream"))
    }

    async fn call_bidi_streaming(
        &self,
        _method: &str,
        items: ItemStream,
    ) -> Result<ItemStream, PipelineError> {
        Ok(items)
    }

    async fn health_check(&self) -> Result<(), PipelineError> {
        if self.healthy {
            Ok(())
        } else {
            Err(PipelineError::transient("still warming up"))
        }
    }
}

/// Builds a unary-unary registered step with an identity model.
pub fn unary_entry(
    name: &str,
    order: u32,
    service: Arc<dyn UnaryUnaryService>,
    input_type: &str,
    output_type: &str,
) -> RegisteredStep {
    RegisteredStep::local(
        step(name, order, StepShape::UnaryUnary),
        StepHandler::UnaryUnary(service),
    )
    .with_model(identity_model(name, input_type, output_type))
}

/// Convenience: aspect config map from key/value pairs.
pub fn aspect_config(
    pairs: &[(&str, &str)],
) -> std::collections::HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Manual per-step config with a small retry budget.
pub fn manual_config(retry_limit: u32, recover: bool) -> StepConfig {
    let mut config = StepConfig::default();
    config
        .set_retry_limit(retry_limit)
        .set_retry_wait(std::time::Duration::from_millis(1))
        .set_max_backoff(std::time::Duration::from_millis(4))
        .set_recover_on_failure(recover);
    config
}
