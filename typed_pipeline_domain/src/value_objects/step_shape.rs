// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Shape Value Object
//!
//! The shape of a step is the pair of its input and output cardinality:
//! whether the step consumes a single value or an asynchronous sequence and
//! whether it emits a single asynchronous value or an asynchronous
//! sequence. Shapes drive three things:
//!
//! - **Contract selection**: which of the four step service traits a step
//!   implements
//! - **Executor adaptation**: how the executor threads the run's stream
//!   through the stage (per-element dispatch, flattening, aggregation)
//! - **Code-generation labelling**: which transport stubs are emitted for a
//!   remote step
//!
//! The pipeline topology document declares shapes through the
//! [`Cardinality`] vocabulary (`ONE_TO_ONE`, `EXPANSION`, `REDUCTION`,
//! `MANY_TO_MANY`), which lowers onto [`StepShape`].

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Cardinality of one side of a step contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Exactly one value.
    Unary,
    /// A lazy sequence of zero or more values plus one terminal.
    Streaming,
}

/// The four streaming shapes a step can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepShape {
    /// Single value in, single asynchronous value out (pure transform).
    UnaryUnary,
    /// Single value in, asynchronous sequence out (fan-out / expansion).
    UnaryStreaming,
    /// Asynchronous sequence in, single asynchronous value out (reduction).
    StreamingUnary,
    /// Asynchronous sequence in, asynchronous sequence out.
    StreamingStreaming,
}

impl StepShape {
    /// Cardinality of the step's input side.
    pub fn input(&self) -> Side {
        match self {
            StepShape::UnaryUnary | StepShape::UnaryStreaming => Side::Unary,
            StepShape::StreamingUnary | StepShape::StreamingStreaming => Side::Streaming,
        }
    }

    /// Cardinality of the step's output side.
    pub fn output(&self) -> Side {
        match self {
            StepShape::UnaryUnary | StepShape::StreamingUnary => Side::Unary,
            StepShape::UnaryStreaming | StepShape::StreamingStreaming => Side::Streaming,
        }
    }

    /// Whether a stage of this shape can feed a stage of shape `next`.
    ///
    /// The executor adapts cardinality between stages (a stream feeds a
    /// unary-input stage once per element; a single value is wrapped as a
    /// one-element stream), so every pairing is executable. The check
    /// exists so callers can distinguish "adapted" pairings from direct
    /// ones when reporting the assembled topology.
    pub fn feeds_directly(&self, next: &StepShape) -> bool {
        self.output() == next.input()
    }
}

impl Display for StepShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepShape::UnaryUnary => "UNARY_UNARY",
            StepShape::UnaryStreaming => "UNARY_STREAMING",
            StepShape::StreamingUnary => "STREAMING_UNARY",
            StepShape::StreamingStreaming => "STREAMING_STREAMING",
        };
        write!(f, "{}", name)
    }
}

/// Declaration-level cardinality vocabulary used by the pipeline topology
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    OneToOne,
    Expansion,
    Reduction,
    ManyToMany,
}

impl Cardinality {
    /// Lowers the declared cardinality onto the runtime step shape.
    pub fn to_shape(self) -> StepShape {
        match self {
            Cardinality::OneToOne => StepShape::UnaryUnary,
            Cardinality::Expansion => StepShape::UnaryStreaming,
            Cardinality::Reduction => StepShape::StreamingUnary,
            Cardinality::ManyToMany => StepShape::StreamingStreaming,
        }
    }
}

impl Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cardinality::OneToOne => "ONE_TO_ONE",
            Cardinality::Expansion => "EXPANSION",
            Cardinality::Reduction => "REDUCTION",
            Cardinality::ManyToMany => "MANY_TO_MANY",
        };
        write!(f, "{}", name)
    }
}
