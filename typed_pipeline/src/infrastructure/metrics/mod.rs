// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Telemetry surface: RPC counters and histograms, SLO aggregates, buffer
//! gauges, and the exactly-once flush.

pub mod flush;
pub mod service;

pub use flush::TelemetryFlusher;
pub use service::{names, RpcMetricsService};
