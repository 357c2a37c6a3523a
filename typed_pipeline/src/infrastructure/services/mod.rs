// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Built-in step services and aspect plugins.

pub mod cache_key;
pub mod debug_observer;
pub mod passthrough;

pub use cache_key::{CacheKeyObserver, Sha256CacheKeyGenerator};
pub use debug_observer::DebugObserver;
pub use passthrough::{
    default_handler_for, LastValueReduction, PassthroughStep, SingletonExpansion,
    StreamPassthrough,
};
