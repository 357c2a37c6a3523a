// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Logging
//!
//! tracing-subscriber initialisation for the orchestrator binary. The
//! filter resolves in order: `RUST_LOG` environment variable, then the
//! `--debug` flag, then the `info` default. Initialisation is idempotent
//! so tests can call it freely.

use tracing_subscriber::EnvFilter;

/// Initialises the global tracing subscriber.
///
/// Returns `false` when a subscriber was already installed (tests,
/// embedding), which is not an error.
pub fn init_logging(debug: bool) -> bool {
    let fallback = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
