// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Backpressure Buffer
//!
//! The bounded FIFO the executor inserts between adjacent stages.
//!
//! - **Full policy**: the upstream producer blocks on `send` until the
//!   consumer drains (cooperative backpressure). Items are never dropped
//!   silently.
//! - **Observability**: depth and capacity are published as the
//!   `tpf.step.buffer.queued` / `tpf.step.buffer.capacity` gauges, tagged
//!   by the upstream step's class.
//! - **Cancellation**: the pump task observes the run token and stops
//!   pulling; dropping the channel releases everything still queued and
//!   the depth gauge is reset so dashboards do not show ghost depth.
//!
//! The buffer is a spawned pump over a bounded `tokio::sync::mpsc`
//! channel: the pump pulls from the upstream stage and sends into the
//! channel, so a slow consumer exerts backpressure on the pump, which in
//! turn stops polling upstream.

use futures::StreamExt;
use tokio::sync::mpsc;

use typed_pipeline_bootstrap::shutdown::CancellationToken;
use typed_pipeline_domain::ItemStream;

use crate::infrastructure::metrics::service::RpcMetricsService;
use std::sync::Arc;

/// Default capacity of inter-stage buffers.
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Links `upstream` through a bounded buffer, returning the downstream
/// side.
///
/// `step_class` identifies the upstream stage on the buffer gauges.
pub fn link(
    upstream: ItemStream,
    capacity: usize,
    step_class: &str,
    metrics: Arc<RpcMetricsService>,
    token: CancellationToken,
) -> ItemStream {
    let capacity = capacity.max(1);
    let queued = metrics.buffer_queued_gauge(step_class);
    metrics.buffer_capacity_gauge(step_class).set(capacity as i64);

    let (tx, mut rx) = mpsc::channel(capacity);
    let pump_queued = queued.clone();
    let step_label = step_class.to_string();

    tokio::spawn(async move {
        let mut upstream = upstream;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(step_class = %step_label, "buffer pump cancelled");
                    break;
                }
                next = upstream.next() => match next {
                    Some(item) => {
                        let terminal = item.is_err();
                        // Blocks when the buffer is full: cooperative
                        // backpressure on the upstream stage.
                        if tx.send(item).await.is_err() {
                            break;
                        }
                        pump_queued.inc();
                        if terminal {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });

    let downstream_queued = queued;
    Box::pin(async_stream::stream! {
        while let Some(item) = rx.recv().await {
            downstream_queued.dec();
            yield item;
        }
        // Anything still queued when the channel closes was dropped with
        // it; zero the gauge so the depth does not dangle.
        downstream_queued.set(0);
    })
}
