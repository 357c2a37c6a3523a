// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Aspect expansion: the pre-execution pass that rewrites a configured
//! step sequence into an expanded sequence with synthetic observer steps.

pub mod expansion;
pub mod side_effect_step;

pub use expansion::{expand, ObserverRegistry};
pub use side_effect_step::SideEffectStep;
