// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # RPC Metrics Service
//!
//! Prometheus-backed telemetry for the pipeline runtime. The service owns
//! its registry explicitly (no hidden singletons); the orchestrator
//! creates one per process and threads it into the executor, adapters,
//! and buffers.
//!
//! ## Stable Names
//!
//! The dotted names in [`names`] are the stable public contract:
//!
//! - `rpc.server.requests` / `rpc.server.processing.duration`, tagged
//!   `(rpc_service, rpc_method, rpc_grpc_status_code)`
//! - `rpc.client.requests` / `rpc.client.processing.duration`, same tags
//! - `tpf.slo.rpc.server.total` / `tpf.slo.rpc.server.latency.total`
//! - `tpf.step.buffer.queued` / `tpf.step.buffer.capacity`, tagged
//!   `step_class`
//!
//! Prometheus identifiers cannot contain dots, so instruments are
//! registered under the deterministic sanitisation of
//! [`prometheus_name`] (dots become underscores). The dotted spelling is
//! what external contracts and dashboards key on; the sanitiser is the
//! single place the two are related.

use prometheus::{
    Counter, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use typed_pipeline_domain::{PipelineError, StatusCode};

/// Stable public metric names.
pub mod names {
    pub const RPC_SERVER_REQUESTS: &str = "rpc.server.requests";
    pub const RPC_SERVER_PROCESSING_DURATION: &str = "rpc.server.processing.duration";
    pub const RPC_CLIENT_REQUESTS: &str = "rpc.client.requests";
    pub const RPC_CLIENT_PROCESSING_DURATION: &str = "rpc.client.processing.duration";
    pub const SLO_RPC_SERVER_TOTAL: &str = "tpf.slo.rpc.server.total";
    pub const SLO_RPC_SERVER_LATENCY_TOTAL: &str = "tpf.slo.rpc.server.latency.total";
    pub const STEP_BUFFER_QUEUED: &str = "tpf.step.buffer.queued";
    pub const STEP_BUFFER_CAPACITY: &str = "tpf.step.buffer.capacity";
}

/// Label keys shared by the RPC instruments.
const RPC_LABELS: &[&str] = &["rpc_service", "rpc_method", "rpc_grpc_status_code"];
/// Label key for the buffer gauges.
const BUFFER_LABELS: &[&str] = &["step_class"];

/// Latency histogram buckets in seconds.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Registration spelling of a stable dotted metric name.
pub fn prometheus_name(stable_name: &str) -> String {
    stable_name.replace('.', "_")
}

/// Process-wide RPC and buffer telemetry.
pub struct RpcMetricsService {
    registry: Arc<Registry>,
    rpc_server_requests: IntCounterVec,
    rpc_server_duration: HistogramVec,
    rpc_client_requests: IntCounterVec,
    rpc_client_duration: HistogramVec,
    slo_rpc_server_total: IntCounter,
    slo_rpc_server_latency_total: Counter,
    step_buffer_queued: IntGaugeVec,
    step_buffer_capacity: IntGaugeVec,
}

impl RpcMetricsService {
    /// Creates the service and registers all instruments on a fresh
    /// registry.
    pub fn new() -> Result<Self, PipelineError> {
        let registry = Registry::new();

        let rpc_server_requests = IntCounterVec::new(
            Opts::new(
                prometheus_name(names::RPC_SERVER_REQUESTS),
                "RPC server requests by service, method, and status code",
            ),
            RPC_LABELS,
        )
        .map_err(|e| {
            PipelineError::metrics_error(format!("Failed to create rpc.server.requests: {}", e))
        })?;

        let rpc_server_duration = HistogramVec::new(
            HistogramOpts::new(
                prometheus_name(names::RPC_SERVER_PROCESSING_DURATION),
                "RPC server processing duration in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            RPC_LABELS,
        )
        .map_err(|e| {
            PipelineError::metrics_error(format!(
                "Failed to create rpc.server.processing.duration: {}",
                e
            ))
        })?;

        let rpc_client_requests = IntCounterVec::new(
            Opts::new(
                prometheus_name(names::RPC_CLIENT_REQUESTS),
                "RPC client requests by service, method, and status code",
            ),
            RPC_LABELS,
        )
        .map_err(|e| {
            PipelineError::metrics_error(format!("Failed to create rpc.client.requests: {}", e))
        })?;

        let rpc_client_duration = HistogramVec::new(
            HistogramOpts::new(
                prometheus_name(names::RPC_CLIENT_PROCESSING_DURATION),
                "RPC client call duration in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            RPC_LABELS,
        )
        .map_err(|e| {
            PipelineError::metrics_error(format!(
                "Failed to create rpc.client.processing.duration: {}",
                e
            ))
        })?;

        let slo_rpc_server_total = IntCounter::with_opts(Opts::new(
            prometheus_name(names::SLO_RPC_SERVER_TOTAL),
            "Total RPC server requests (SLO aggregate)",
        ))
        .map_err(|e| {
            PipelineError::metrics_error(format!("Failed to create tpf.slo.rpc.server.total: {}", e))
        })?;

        let slo_rpc_server_latency_total = Counter::with_opts(Opts::new(
            prometheus_name(names::SLO_RPC_SERVER_LATENCY_TOTAL),
            "Cumulative RPC server latency in seconds (SLO aggregate)",
        ))
        .map_err(|e| {
            PipelineError::metrics_error(format!(
                "Failed to create tpf.slo.rpc.server.latency.total: {}",
                e
            ))
        })?;

        let step_buffer_queued = IntGaugeVec::new(
            Opts::new(
                prometheus_name(names::STEP_BUFFER_QUEUED),
                "Items queued in the backpressure buffer downstream of a step",
            ),
            BUFFER_LABELS,
        )
        .map_err(|e| {
            PipelineError::metrics_error(format!("Failed to create tpf.step.buffer.queued: {}", e))
        })?;

        let step_buffer_capacity = IntGaugeVec::new(
            Opts::new(
                prometheus_name(names::STEP_BUFFER_CAPACITY),
                "Configured capacity of the backpressure buffer downstream of a step",
            ),
            BUFFER_LABELS,
        )
        .map_err(|e| {
            PipelineError::metrics_error(format!("Failed to create tpf.step.buffer.capacity: {}", e))
        })?;

        for collector in [
            Box::new(rpc_server_requests.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(rpc_server_duration.clone()),
            Box::new(rpc_client_requests.clone()),
            Box::new(rpc_client_duration.clone()),
            Box::new(slo_rpc_server_total.clone()),
            Box::new(slo_rpc_server_latency_total.clone()),
            Box::new(step_buffer_queued.clone()),
            Box::new(step_buffer_capacity.clone()),
        ] {
            registry.register(collector).map_err(|e| {
                PipelineError::metrics_error(format!("Failed to register metric: {}", e))
            })?;
        }

        debug!("RpcMetricsService initialized with Prometheus registry");

        Ok(Self {
            registry: Arc::new(registry),
            rpc_server_requests,
            rpc_server_duration,
            rpc_client_requests,
            rpc_client_duration,
            slo_rpc_server_total,
            slo_rpc_server_latency_total,
            step_buffer_queued,
            step_buffer_capacity,
        })
    }

    /// The underlying registry, for exposition endpoints and the flush.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Records a server-side RPC termination: status-tagged counter,
    /// latency histogram, and the SLO aggregates.
    pub fn record_server_call(
        &self,
        service: &str,
        method: &str,
        status: StatusCode,
        elapsed: Duration,
    ) {
        let labels = [service, method, status.as_str()];
        self.rpc_server_requests.with_label_values(&labels).inc();
        self.rpc_server_duration
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
        self.slo_rpc_server_total.inc();
        self.slo_rpc_server_latency_total.inc_by(elapsed.as_secs_f64());
    }

    /// Records a client-side RPC termination.
    pub fn record_client_call(
        &self,
        service: &str,
        method: &str,
        status: StatusCode,
        elapsed: Duration,
    ) {
        let labels = [service, method, status.as_str()];
        self.rpc_client_requests.with_label_values(&labels).inc();
        self.rpc_client_duration
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
    }

    /// Depth gauge for the buffer downstream of `step_class`.
    pub fn buffer_queued_gauge(&self, step_class: &str) -> IntGauge {
        self.step_buffer_queued.with_label_values(&[step_class])
    }

    /// Capacity gauge for the buffer downstream of `step_class`.
    pub fn buffer_capacity_gauge(&self, step_class: &str) -> IntGauge {
        self.step_buffer_capacity.with_label_values(&[step_class])
    }

    /// Point value of the server request counter for one label set.
    /// Primarily for tests and the flush summary.
    pub fn server_requests_value(&self, service: &str, method: &str, status: StatusCode) -> u64 {
        self.rpc_server_requests
            .with_label_values(&[service, method, status.as_str()])
            .get()
    }

    /// Total server requests recorded (SLO aggregate point value).
    pub fn slo_server_total_value(&self) -> u64 {
        self.slo_rpc_server_total.get()
    }
}
