// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Telemetry Flush
//!
//! The exactly-once telemetry flush invoked on orchestrator termination
//! paths. Both the executor and the orchestrator call [`flush`] on their
//! way out (success, failure, or cancellation); the first call wins and
//! later calls are no-ops, which is what lets every exit path flush
//! unconditionally without double-reporting.
//!
//! [`flush`]: TelemetryFlusher::flush

use prometheus::Encoder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::infrastructure::metrics::service::RpcMetricsService;

/// Exactly-once flush gate over the process metrics registry.
pub struct TelemetryFlusher {
    metrics: Arc<RpcMetricsService>,
    flushed: AtomicBool,
}

impl TelemetryFlusher {
    pub fn new(metrics: Arc<RpcMetricsService>) -> Self {
        Self {
            metrics,
            flushed: AtomicBool::new(false),
        }
    }

    /// Flushes the telemetry registry.
    ///
    /// Returns `true` on the call that actually flushed, `false` on every
    /// later call.
    pub fn flush(&self) -> bool {
        if self.flushed.swap(true, Ordering::SeqCst) {
            return false;
        }

        let families = self.metrics.registry().gather();
        let mut buffer = Vec::new();
        let encoder = prometheus::TextEncoder::new();
        match encoder.encode(&families, &mut buffer) {
            Ok(()) => {
                tracing::info!(
                    metric_families = families.len(),
                    exposition_bytes = buffer.len(),
                    "telemetry flushed"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "telemetry flush failed to encode registry");
            }
        }
        true
    }

    /// Whether the flush already ran.
    pub fn is_flushed(&self) -> bool {
        self.flushed.load(Ordering::SeqCst)
    }
}
