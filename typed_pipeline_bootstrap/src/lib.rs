// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the enterprise application layers
//! (domain, application, infrastructure) and provides:
//!
//! - **Argument parsing** - CLI parsing and validation for the
//!   orchestrator surface
//! - **Exit codes** - Unix `sysexits.h` mapping, including the USAGE code
//!   the orchestrator contract requires for missing or malformed input
//! - **Logging init** - tracing-subscriber setup with env-filter support
//! - **Signal handling** - SIGTERM/SIGINT wired to cancellation
//! - **Shutdown coordination** - cancellation tokens and grace periods
//!   consumed by the pipeline executor at every suspension point
//!
//! ## Architecture Position
//!
//! Bootstrap can access all layers; enterprise layers never access
//! bootstrap. The runtime crate receives a [`shutdown::CancellationToken`]
//! and remains unaware of how signals or CLI flags produced it.
//!
//! ## Module Structure
//!
//! - `cli` - orchestrator argument parsing and validation
//! - `exit_code` - Unix exit code enumeration and error mapping
//! - `logger` - bootstrap logging initialisation
//! - `shutdown` - cancellation tokens, coordinator, signal wiring

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod shutdown;

// Re-export commonly used types
pub use cli::{parse_and_validate, ParseError, ValidatedCli};
pub use exit_code::ExitCode;
pub use shutdown::{CancellationToken, ShutdownCoordinator};

/// Bootstrap and parse CLI arguments.
///
/// Entry point for the bootstrap layer: parses the process arguments with
/// clap (which handles `--help`/`--version` itself) and applies the
/// orchestrator's validation rules.
///
/// # Errors
///
/// Returns [`cli::ParseError`] when validation fails; callers map it to
/// [`ExitCode::UsageError`].
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
