// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Server Adapters
//!
//! Composition-based adapter templates, one per streaming shape, wrapping
//! a user step's business function. Responsibilities in call order:
//!
//! 1. **Decode** wire input to domain input through the inbound mapper
//!    (or cast directly for identity mappings).
//! 2. **Dispatch** the user function.
//! 3. **Auto-persist** when enabled and a persistence manager is bound:
//!    the domain input for UNARY_UNARY, the reduced output once for
//!    STREAMING_UNARY, each emitted domain output for the streaming
//!    shapes. Persistence is scoped by an acquired session: commit on
//!    success, rollback on failure, release on every exit path.
//! 4. **Encode** domain output through the outbound mapper.
//! 5. **Translate errors** into transport status `INTERNAL`, preserving
//!    the original message as the status description.
//! 6. **Record RPC metrics** on termination: status code, service,
//!    method, and elapsed time.
//!
//! Each adapter implements the same step contract as the function it
//! wraps, so the executor cannot tell an adapted step from a plain one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::StreamExt;

use typed_pipeline_domain::services::persistence::PersistenceManager;
use typed_pipeline_domain::{
    ItemStream, PipelineError, PipelineItem, StatusCode, StepConfig, StreamingStreamingService,
    StreamingUnaryService, UnaryStreamingService, UnaryUnaryService,
};

use crate::infrastructure::adapters::mapper::ItemMapper;
use crate::infrastructure::metrics::service::RpcMetricsService;
use crate::infrastructure::streams::stream_ext::PipelineStreamExt;

/// Converts a payload through an optional mapper, preserving item
/// identity.
fn convert(
    item: PipelineItem,
    mapper: &Option<Arc<dyn ItemMapper>>,
) -> Result<PipelineItem, PipelineError> {
    match mapper {
        Some(mapper) => {
            let converted = mapper.map(item.payload().clone())?;
            Ok(item.with_payload(converted))
        }
        None => Ok(item),
    }
}

/// Persists one item inside a freshly acquired, transaction-scoped
/// session. The session is always released: commit on success, rollback
/// on failure.
async fn persist_scoped(
    manager: &Arc<dyn PersistenceManager>,
    step_name: &str,
    item: &PipelineItem,
) -> Result<(), PipelineError> {
    let mut session = manager.begin().await?;
    match session.persist(step_name, item).await {
        Ok(()) => session.commit().await,
        Err(error) => {
            if let Err(rollback_error) = session.rollback().await {
                tracing::warn!(
                    step = step_name,
                    error = %rollback_error,
                    "rollback failed after persistence error"
                );
            }
            Err(error)
        }
    }
}

/// Translates a step failure into its wire form: status `INTERNAL` with
/// the original message. Cancellation passes through untranslated.
fn translate(error: PipelineError) -> PipelineError {
    if error.is_cancellation() || matches!(error, PipelineError::TransportStatus { .. }) {
        error
    } else {
        PipelineError::transport_internal(error.to_string())
    }
}

/// Shared plumbing of the four adapters.
struct AdapterCore {
    service_name: String,
    method: String,
    persistence: Option<Arc<dyn PersistenceManager>>,
    auto_persist: AtomicBool,
    metrics: Arc<RpcMetricsService>,
}

impl AdapterCore {
    fn new(
        service_name: String,
        method: String,
        persistence: Option<Arc<dyn PersistenceManager>>,
        metrics: Arc<RpcMetricsService>,
    ) -> Self {
        Self {
            service_name,
            method,
            persistence,
            auto_persist: AtomicBool::new(false),
            metrics,
        }
    }

    fn initialise(&self, config: &StepConfig) {
        let enabled = config.auto_persist() && self.persistence.is_some();
        self.auto_persist.store(enabled, Ordering::SeqCst);
        if config.debug() {
            tracing::debug!(
                service = %self.service_name,
                auto_persist = enabled,
                "server adapter initialised"
            );
        }
    }

    fn auto_persist(&self) -> bool {
        self.auto_persist.load(Ordering::SeqCst)
    }

    async fn persist(&self, item: &PipelineItem) -> Result<(), PipelineError> {
        if !self.auto_persist() {
            return Ok(());
        }
        match &self.persistence {
            Some(manager) => persist_scoped(manager, &self.service_name, item).await,
            None => Ok(()),
        }
    }

    fn record(&self, status: StatusCode, started: Instant) {
        self.metrics
            .record_server_call(&self.service_name, &self.method, status, started.elapsed());
    }
}

/// UNARY_UNARY adapter: decode, dispatch, persist the domain input,
/// encode.
pub struct UnaryUnaryServerAdapter {
    core: AdapterCore,
    business: Arc<dyn UnaryUnaryService>,
    inbound: Option<Arc<dyn ItemMapper>>,
    outbound: Option<Arc<dyn ItemMapper>>,
}

impl UnaryUnaryServerAdapter {
    pub fn new(
        service_name: impl Into<String>,
        method: impl Into<String>,
        business: Arc<dyn UnaryUnaryService>,
        inbound: Option<Arc<dyn ItemMapper>>,
        outbound: Option<Arc<dyn ItemMapper>>,
        persistence: Option<Arc<dyn PersistenceManager>>,
        metrics: Arc<RpcMetricsService>,
    ) -> Self {
        Self {
            core: AdapterCore::new(service_name.into(), method.into(), persistence, metrics),
            business,
            inbound,
            outbound,
        }
    }

    async fn process(&self, wire_in: PipelineItem) -> Result<PipelineItem, PipelineError> {
        let domain_in = convert(wire_in, &self.inbound)?;
        let domain_out = self.business.apply(domain_in.clone()).await?;
        self.core.persist(&domain_in).await?;
        convert(domain_out, &self.outbound)
    }
}

#[async_trait]
impl UnaryUnaryService for UnaryUnaryServerAdapter {
    async fn apply(&self, item: PipelineItem) -> Result<PipelineItem, PipelineError> {
        let started = Instant::now();
        let result = self.process(item).await.map_err(translate);
        let status = match &result {
            Ok(_) => StatusCode::Ok,
            Err(error) => error.status_code(),
        };
        self.core.record(status, started);
        result
    }

    fn initialise(&self, config: &StepConfig) {
        self.core.initialise(config);
        self.business.initialise(config);
    }

    fn has_dead_letter(&self) -> bool {
        self.business.has_dead_letter()
    }

    async fn dead_letter(
        &self,
        item: PipelineItem,
        cause: PipelineError,
    ) -> Result<Option<PipelineItem>, PipelineError> {
        self.business.dead_letter(item, cause).await
    }
}

/// Wraps a dispatched output stream with per-item persistence, encoding,
/// error translation, and a metrics record on termination.
fn adapt_output_stream(
    stream: ItemStream,
    service_name: String,
    method: String,
    outbound: Option<Arc<dyn ItemMapper>>,
    persistence: Option<Arc<dyn PersistenceManager>>,
    auto_persist: bool,
    metrics: Arc<RpcMetricsService>,
    started: Instant,
) -> ItemStream {
    let failed = Arc::new(AtomicBool::new(false));
    let failed_in_stream = failed.clone();
    let persist_name = service_name.clone();

    let adapted = async_stream::stream! {
        let mut inner = stream;
        while let Some(next) = inner.next().await {
            match next {
                Ok(domain_out) => {
                    if auto_persist {
                        if let Some(manager) = &persistence {
                            if let Err(error) =
                                persist_scoped(manager, &persist_name, &domain_out).await
                            {
                                failed_in_stream.store(true, Ordering::SeqCst);
                                yield Err(translate(error));
                                break;
                            }
                        }
                    }
                    match convert(domain_out, &outbound) {
                        Ok(wire_out) => yield Ok(wire_out),
                        Err(error) => {
                            failed_in_stream.store(true, Ordering::SeqCst);
                            yield Err(translate(error));
                            break;
                        }
                    }
                }
                Err(error) => {
                    failed_in_stream.store(true, Ordering::SeqCst);
                    yield Err(translate(error));
                    break;
                }
            }
        }
    };

    adapted.on_termination(move || {
        let status = if failed.load(Ordering::SeqCst) {
            StatusCode::Internal
        } else {
            StatusCode::Ok
        };
        metrics.record_server_call(&service_name, &method, status, started.elapsed());
    })
}

/// UNARY_STREAMING adapter: decode, dispatch, persist and encode each
/// emitted item.
pub struct UnaryStreamingServerAdapter {
    core: AdapterCore,
    business: Arc<dyn UnaryStreamingService>,
    inbound: Option<Arc<dyn ItemMapper>>,
    outbound: Option<Arc<dyn ItemMapper>>,
}

impl UnaryStreamingServerAdapter {
    pub fn new(
        service_name: impl Into<String>,
        method: impl Into<String>,
        business: Arc<dyn UnaryStreamingService>,
        inbound: Option<Arc<dyn ItemMapper>>,
        outbound: Option<Arc<dyn ItemMapper>>,
        persistence: Option<Arc<dyn PersistenceManager>>,
        metrics: Arc<RpcMetricsService>,
    ) -> Self {
        Self {
            core: AdapterCore::new(service_name.into(), method.into(), persistence, metrics),
            business,
            inbound,
            outbound,
        }
    }
}

#[async_trait]
impl UnaryStreamingService for UnaryStreamingServerAdapter {
    async fn apply(&self, item: PipelineItem) -> Result<ItemStream, PipelineError> {
        let started = Instant::now();

        let dispatched = async {
            let domain_in = convert(item, &self.inbound)?;
            self.business.apply(domain_in).await
        }
        .await;

        match dispatched {
            Ok(stream) => Ok(adapt_output_stream(
                stream,
                self.core.service_name.clone(),
                self.core.method.clone(),
                self.outbound.clone(),
                self.core.persistence.clone(),
                self.core.auto_persist(),
                self.core.metrics.clone(),
                started,
            )),
            Err(error) => {
                let error = translate(error);
                self.core.record(error.status_code(), started);
                Err(error)
            }
        }
    }

    fn initialise(&self, config: &StepConfig) {
        self.core.initialise(config);
        self.business.initialise(config);
    }

    fn has_dead_letter(&self) -> bool {
        self.business.has_dead_letter()
    }

    async fn dead_letter(
        &self,
        item: PipelineItem,
        cause: PipelineError,
    ) -> Result<Option<PipelineItem>, PipelineError> {
        self.business.dead_letter(item, cause).await
    }
}

/// STREAMING_UNARY adapter: decode each upstream item, dispatch the
/// aggregation, persist the reduced output once, encode.
pub struct StreamingUnaryServerAdapter {
    core: AdapterCore,
    business: Arc<dyn StreamingUnaryService>,
    inbound: Option<Arc<dyn ItemMapper>>,
    outbound: Option<Arc<dyn ItemMapper>>,
}

impl StreamingUnaryServerAdapter {
    pub fn new(
        service_name: impl Into<String>,
        method: impl Into<String>,
        business: Arc<dyn StreamingUnaryService>,
        inbound: Option<Arc<dyn ItemMapper>>,
        outbound: Option<Arc<dyn ItemMapper>>,
        persistence: Option<Arc<dyn PersistenceManager>>,
        metrics: Arc<RpcMetricsService>,
    ) -> Self {
        Self {
            core: AdapterCore::new(service_name.into(), method.into(), persistence, metrics),
            business,
            inbound,
            outbound,
        }
    }
}

#[async_trait]
impl StreamingUnaryService for StreamingUnaryServerAdapter {
    async fn apply(&self, items: ItemStream) -> Result<PipelineItem, PipelineError> {
        let started = Instant::now();
        let inbound = self.inbound.clone();
        let decoded: ItemStream = items
            .map(move |next| next.and_then(|item| convert(item, &inbound)))
            .boxed();

        let result = async {
            let reduced = self.business.apply(decoded).await?;
            self.core.persist(&reduced).await?;
            convert(reduced, &self.outbound)
        }
        .await
        .map_err(translate);

        let status = match &result {
            Ok(_) => StatusCode::Ok,
            Err(error) => error.status_code(),
        };
        self.core.record(status, started);
        result
    }

    fn initialise(&self, config: &StepConfig) {
        self.core.initialise(config);
        self.business.initialise(config);
    }
}

/// STREAMING_STREAMING adapter: decode each upstream item, dispatch,
/// persist and encode each emitted item.
pub struct StreamingStreamingServerAdapter {
    core: AdapterCore,
    business: Arc<dyn StreamingStreamingService>,
    inbound: Option<Arc<dyn ItemMapper>>,
    outbound: Option<Arc<dyn ItemMapper>>,
}

impl StreamingStreamingServerAdapter {
    pub fn new(
        service_name: impl Into<String>,
        method: impl Into<String>,
        business: Arc<dyn StreamingStreamingService>,
        inbound: Option<Arc<dyn ItemMapper>>,
        outbound: Option<Arc<dyn ItemMapper>>,
        persistence: Option<Arc<dyn PersistenceManager>>,
        metrics: Arc<RpcMetricsService>,
    ) -> Self {
        Self {
            core: AdapterCore::new(service_name.into(), method.into(), persistence, metrics),
            business,
            inbound,
            outbound,
        }
    }
}

#[async_trait]
impl StreamingStreamingService for StreamingStreamingServerAdapter {
    async fn apply(&self, items: ItemStream) -> Result<ItemStream, PipelineError> {
        let started = Instant::now();
        let inbound = self.inbound.clone();
        let decoded: ItemStream = items
            .map(move |next| next.and_then(|item| convert(item, &inbound)))
            .boxed();

        match self.business.apply(decoded).await {
            Ok(stream) => Ok(adapt_output_stream(
                stream,
                self.core.service_name.clone(),
                self.core.method.clone(),
                self.outbound.clone(),
                self.core.persistence.clone(),
                self.core.auto_persist(),
                self.core.metrics.clone(),
                started,
            )),
            Err(error) => {
                let error = translate(error);
                self.core.record(error.status_code(), started);
                Err(error)
            }
        }
    }

    fn initialise(&self, config: &StepConfig) {
        self.core.initialise(config);
        self.business.initialise(config);
    }
}
