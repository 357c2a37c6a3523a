// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Startup Readiness Gate
//!
//! Before the executor admits external input, every remote client step
//! must report healthy. The gate polls each transport's health check on a
//! fixed interval until all pass, the deadline expires
//! (`StartupTimeout`), or the run is cancelled.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use typed_pipeline_bootstrap::shutdown::CancellationToken;
use typed_pipeline_domain::services::remote_transport::RemoteTransport;
use typed_pipeline_domain::PipelineError;

/// Default startup deadline.
pub const DEFAULT_STARTUP_DEADLINE: Duration = Duration::from_secs(120);
/// Interval between health-check rounds.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Readiness gate over the pipeline's remote client transports.
pub struct ReadinessGate {
    deadline: Duration,
    poll_interval: Duration,
}

impl ReadinessGate {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Overrides the poll interval (tests).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Waits until every client reports healthy.
    ///
    /// `clients` pairs each step name with its transport. Returns
    /// immediately when the pipeline has no remote steps.
    ///
    /// # Errors
    /// - `PipelineError::StartupTimeout` naming the unhealthy steps when
    ///   the deadline expires
    /// - `PipelineError::Cancelled` when the run token fires first
    pub async fn await_ready(
        &self,
        clients: &[(String, Arc<dyn RemoteTransport>)],
        token: &CancellationToken,
    ) -> Result<(), PipelineError> {
        if clients.is_empty() {
            return Ok(());
        }

        let started = Instant::now();
        loop {
            let mut unhealthy = Vec::new();
            for (step_name, transport) in clients {
                if token.is_cancelled() {
                    return Err(PipelineError::cancelled("startup aborted"));
                }
                if let Err(error) = transport.health_check().await {
                    tracing::debug!(step = %step_name, error = %error, "client step not yet healthy");
                    unhealthy.push(step_name.as_str());
                }
            }

            if unhealthy.is_empty() {
                tracing::info!(clients = clients.len(), "all remote client steps healthy");
                return Ok(());
            }

            if started.elapsed() >= self.deadline {
                return Err(PipelineError::startup_timeout(format!(
                    "remote client steps not healthy within {:?}: {}",
                    self.deadline,
                    unhealthy.join(", ")
                )));
            }

            tokio::select! {
                _ = token.cancelled() => return Err(PipelineError::cancelled("startup aborted")),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(DEFAULT_STARTUP_DEADLINE)
    }
}
