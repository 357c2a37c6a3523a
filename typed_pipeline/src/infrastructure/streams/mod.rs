// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Reactive Stream Primitives
//!
//! Thin in-house abstractions over the `futures` ecosystem:
//!
//! - [`single::Single`] - a computation that eventually emits exactly one
//!   value or one failure, with lazy (re-subscribable) sources,
//!   transform/flat-map, failure recovery, retry-with-backoff, and
//!   guaranteed-once termination hooks
//! - [`stream_ext::PipelineStreamExt`] - adapters over `futures::Stream`
//!   for the framework's `Result`-stream convention: termination guards,
//!   failure recovery, and cooperative cancellation
//!
//! Backpressure is cooperative throughout: nothing in this module drops
//! items silently. The bounded inter-stage buffer lives in
//! `runtime::backpressure`.

pub mod single;
pub mod stream_ext;

pub use single::Single;
pub use stream_ext::{PipelineStreamExt, TerminationGuard};
