// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Item Value Object
//!
//! The unit of data that flows between pipeline stages. Every item carries
//! a sequence number assigned at ingestion and a JSON document payload.
//!
//! ## Sequence Numbers
//!
//! Sequence numbers are the backbone of the framework's ordering
//! guarantees: a stage under strict ordering must emit items in the same
//! sequence order it received them, even when it processed them
//! concurrently. Transformations preserve the sequence number of the item
//! they derive from; expansion stages derive child items that share their
//! parent's sequence number and gain a child index.
//!
//! ## Payloads
//!
//! Payloads are `serde_json::Value` documents. Steps that work with
//! strongly-typed domain models deserialize at their boundary; the
//! executor itself never inspects payload contents, which is what lets it
//! treat local steps, server adapters, and remote client steps uniformly.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};

/// A single unit of work flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineItem {
    /// Position of this item in its run's input order (0-based).
    sequence: u64,
    /// Index among siblings when the item was produced by an expansion
    /// stage; `None` for items that entered the pipeline directly.
    child_index: Option<u64>,
    /// The JSON document being processed.
    payload: Value,
}

impl PipelineItem {
    /// Creates a new item with the given ingestion sequence number.
    pub fn new(sequence: u64, payload: Value) -> Self {
        Self {
            sequence,
            child_index: None,
            payload,
        }
    }

    /// Gets the ingestion sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Gets the expansion child index, if this item was fanned out.
    pub fn child_index(&self) -> Option<u64> {
        self.child_index
    }

    /// Gets a reference to the payload document.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consumes the item, returning its payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Returns a new item with the same identity and a replaced payload.
    ///
    /// This is the transform primitive: a stage that maps a value keeps
    /// the sequence number so downstream ordering still holds.
    pub fn with_payload(&self, payload: Value) -> Self {
        Self {
            sequence: self.sequence,
            child_index: self.child_index,
            payload,
        }
    }

    /// Returns a child item derived from this one by an expansion stage.
    pub fn child(&self, child_index: u64, payload: Value) -> Self {
        Self {
            sequence: self.sequence,
            child_index: Some(child_index),
            payload,
        }
    }

    /// Applies a payload transformation, preserving item identity.
    pub fn map_payload(self, f: impl FnOnce(Value) -> Value) -> Self {
        Self {
            sequence: self.sequence,
            child_index: self.child_index,
            payload: f(self.payload),
        }
    }
}

impl Display for PipelineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.child_index {
            Some(child) => write!(f, "item #{}.{}", self.sequence, child),
            None => write!(f, "item #{}", self.sequence),
        }
    }
}
