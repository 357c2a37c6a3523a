// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Client Steps
//!
//! Typed façades over remote endpoints, one per streaming shape. A client
//! step implements the same step contract as a local step, so the
//! executor cannot tell them apart; locality only selected the transport.
//!
//! Every call opens an `rpc` span (`rpc.system = "grpc"`, `rpc.service`,
//! `rpc.method`, `rpc.grpc.status_code`) and records client-side metrics
//! on termination. Transports arrive through constructor injection of a
//! `TransportFactory` plus a `TransportOptions` struct; the generated
//! code holds no framework vocabulary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use typed_pipeline_domain::services::remote_transport::{
    RemoteTransport, TransportFactory, TransportOptions,
};
use typed_pipeline_domain::{
    ItemStream, PipelineError, PipelineItem, StatusCode, StepConfig, StreamingStreamingService,
    StreamingUnaryService, UnaryStreamingService, UnaryUnaryService,
};

use crate::infrastructure::metrics::service::RpcMetricsService;
use crate::infrastructure::streams::stream_ext::PipelineStreamExt;

/// Shared identity and telemetry plumbing of the client steps.
struct ClientCore {
    service_name: String,
    method: String,
    transport: Arc<dyn RemoteTransport>,
    metrics: Arc<RpcMetricsService>,
}

impl ClientCore {
    fn new(method: String, transport: Arc<dyn RemoteTransport>, metrics: Arc<RpcMetricsService>) -> Self {
        Self {
            service_name: transport.service_name().to_string(),
            method,
            transport,
            metrics,
        }
    }

    fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "rpc",
            rpc.system = "grpc",
            rpc.service = %self.service_name,
            rpc.method = %self.method,
            rpc.grpc.status_code = tracing::field::Empty,
        )
    }

    fn record(&self, status: StatusCode, started: Instant, span: &tracing::Span) {
        span.record("rpc.grpc.status_code", status.as_str());
        self.metrics
            .record_client_call(&self.service_name, &self.method, status, started.elapsed());
    }

    /// Wraps a streamed response so metrics and the span status are
    /// recorded once, when the stream terminates.
    fn record_on_termination(
        &self,
        stream: ItemStream,
        started: Instant,
        span: tracing::Span,
    ) -> ItemStream {
        let failed = Arc::new(AtomicBool::new(false));
        let failed_probe = failed.clone();
        let metrics = self.metrics.clone();
        let service_name = self.service_name.clone();
        let method = self.method.clone();

        stream
            .map_failure(move |error| {
                failed_probe.store(true, Ordering::SeqCst);
                error
            })
            .on_termination(move || {
                let status = if failed.load(Ordering::SeqCst) {
                    StatusCode::Internal
                } else {
                    StatusCode::Ok
                };
                span.record("rpc.grpc.status_code", status.as_str());
                metrics.record_client_call(&service_name, &method, status, started.elapsed());
            })
    }
}

macro_rules! client_constructors {
    ($name:ident) => {
        impl $name {
            /// Builds the client over an already-connected transport.
            pub fn new(
                method: impl Into<String>,
                transport: Arc<dyn RemoteTransport>,
                metrics: Arc<RpcMetricsService>,
            ) -> Self {
                Self {
                    core: ClientCore::new(method.into(), transport, metrics),
                }
            }

            /// Connects through an injected transport factory.
            pub fn connect(
                factory: &dyn TransportFactory,
                options: &TransportOptions,
                method: impl Into<String>,
                metrics: Arc<RpcMetricsService>,
            ) -> Result<Self, PipelineError> {
                let transport = factory.connect(options)?;
                Ok(Self::new(method, transport, metrics))
            }

            /// The transport backing this client, for readiness probing.
            pub fn transport(&self) -> Arc<dyn RemoteTransport> {
                self.core.transport.clone()
            }
        }
    };
}

/// UNARY_UNARY client step.
pub struct UnaryUnaryClientStep {
    core: ClientCore,
}

client_constructors!(UnaryUnaryClientStep);

#[async_trait]
impl UnaryUnaryService for UnaryUnaryClientStep {
    async fn apply(&self, item: PipelineItem) -> Result<PipelineItem, PipelineError> {
        let started = Instant::now();
        let span = self.core.span();
        let result = self
            .core
            .transport
            .call_unary(&self.core.method, item)
            .instrument(span.clone())
            .await;
        let status = match &result {
            Ok(_) => StatusCode::Ok,
            Err(error) => error.status_code(),
        };
        self.core.record(status, started, &span);
        result
    }

    fn initialise(&self, config: &StepConfig) {
        if config.debug() {
            tracing::debug!(service = %self.core.service_name, "client step initialised");
        }
    }
}

/// UNARY_STREAMING client step.
pub struct UnaryStreamingClientStep {
    core: ClientCore,
}

client_constructors!(UnaryStreamingClientStep);

#[async_trait]
impl UnaryStreamingService for UnaryStreamingClientStep {
    async fn apply(&self, item: PipelineItem) -> Result<ItemStream, PipelineError> {
        let started = Instant::now();
        let span = self.core.span();
        match self
            .core
            .transport
            .call_server_streaming(&self.core.method, item)
            .instrument(span.clone())
            .await
        {
            Ok(stream) => Ok(self.core.record_on_termination(stream, started, span)),
            Err(error) => {
                self.core.record(error.status_code(), started, &span);
                Err(error)
            }
        }
    }
}

/// STREAMING_UNARY client step.
pub struct StreamingUnaryClientStep {
    core: ClientCore,
}

client_constructors!(StreamingUnaryClientStep);

#[async_trait]
impl StreamingUnaryService for StreamingUnaryClientStep {
    async fn apply(&self, items: ItemStream) -> Result<PipelineItem, PipelineError> {
        let started = Instant::now();
        let span = self.core.span();
        let result = self
            .core
            .transport
            .call_client_streaming(&self.core.method, items)
            .instrument(span.clone())
            .await;
        let status = match &result {
            Ok(_) => StatusCode::Ok,
            Err(error) => error.status_code(),
        };
        self.core.record(status, started, &span);
        result
    }
}

/// STREAMING_STREAMING client step.
pub struct StreamingStreamingClientStep {
    core: ClientCore,
}

client_constructors!(StreamingStreamingClientStep);

#[async_trait]
impl StreamingStreamingService for StreamingStreamingClientStep {
    async fn apply(&self, items: ItemStream) -> Result<ItemStream, PipelineError> {
        let started = Instant::now();
        let span = self.core.span();
        match self
            .core
            .transport
            .call_bidi_streaming(&self.core.method, items)
            .instrument(span.clone())
            .await
        {
            Ok(stream) => Ok(self.core.record_on_termination(stream, started, span)),
            Err(error) => {
                self.core.record(error.status_code(), started, &span);
                Err(error)
            }
        }
    }
}
