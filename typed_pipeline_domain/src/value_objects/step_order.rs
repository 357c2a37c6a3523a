// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Order Value Object
//!
//! Type-safe ordering for pipeline steps. Lower orders execute first; ties
//! between equal orders are broken by declaration order (the executor uses
//! a stable sort). Orders must be positive.
//!
//! ## Benefits Over Raw Integers
//!
//! - **Type Safety**: a `StepOrder` cannot be confused with other numeric
//!   values in a signature
//! - **Business Rules**: positivity and navigation limits are validated
//!   once, at construction
//! - **Serialization**: positive integer representation for configuration
//!   documents and APIs

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::PipelineError;

/// Step order value object for deterministic pipeline sequencing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct StepOrder(u32);

impl StepOrder {
    /// Creates a new step order.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidConfiguration` when `order` is zero;
    /// step orders must be positive for deterministic sequencing.
    pub fn new(order: u32) -> Result<Self, PipelineError> {
        if order == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "Step order must be positive (greater than 0)".to_string(),
            ));
        }
        Ok(Self(order))
    }

    /// Creates the first step order (value 1).
    pub fn first() -> Self {
        Self(1)
    }

    /// Gets the underlying order value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Checks if this step comes before another.
    pub fn comes_before(&self, other: &StepOrder) -> bool {
        self.0 < other.0
    }

    /// Checks if this step comes after another.
    pub fn comes_after(&self, other: &StepOrder) -> bool {
        self.0 > other.0
    }

    /// Gets the next step order in sequence.
    ///
    /// # Errors
    /// Returns an error when the current order is `u32::MAX`.
    pub fn next(&self) -> Result<StepOrder, PipelineError> {
        if self.0 == u32::MAX {
            return Err(PipelineError::InvalidConfiguration(
                "Cannot create next step order: maximum value reached".to_string(),
            ));
        }
        Ok(Self(self.0 + 1))
    }
}

impl Display for StepOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero() {
        assert!(StepOrder::new(0).is_err());
        assert!(StepOrder::new(1).is_ok());
    }

    #[test]
    fn test_ordering() {
        let a = StepOrder::new(1).unwrap();
        let b = StepOrder::new(2).unwrap();
        assert!(a.comes_before(&b));
        assert!(b.comes_after(&a));
        assert!(a < b);
    }

    #[test]
    fn test_next() {
        let a = StepOrder::first();
        assert_eq!(a.next().unwrap().value(), 2);
        let max = StepOrder::new(u32::MAX).unwrap();
        assert!(max.next().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let order = StepOrder::new(7).unwrap();
        let json = serde_json::to_string(&order).unwrap();
        assert_eq!(json, "7");
        let back: StepOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }
}
