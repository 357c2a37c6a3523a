// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Type Mapping Value Object
//!
//! A directed relation between a domain type and its wire/DTO
//! representation, plus the identity of the mapper that converts between
//! them. Server adapters use the inbound mapping to decode wire input into
//! the domain model and the outbound mapping to encode domain output back
//! to the wire; when a mapping is the identity (wire type equals domain
//! type) no mapper runs and values pass through unchanged.
//!
//! Invariant: a mapping that names a wire type different from its domain
//! type must name a mapper. This is checked at construction so a missing
//! mapper surfaces at assembly time, not mid-run.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::PipelineError;

/// Relation between a domain type and a wire type with an optional mapper
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeMapping {
    domain_type: String,
    wire_type: String,
    mapper: Option<String>,
}

impl TypeMapping {
    /// Creates a mapping between distinct domain and wire types.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidConfiguration` when the type names
    /// differ but no mapper is provided, or when either name is empty.
    pub fn new(
        domain_type: impl Into<String>,
        wire_type: impl Into<String>,
        mapper: Option<String>,
    ) -> Result<Self, PipelineError> {
        let domain_type = domain_type.into();
        let wire_type = wire_type.into();

        if domain_type.is_empty() || wire_type.is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "Type mapping requires non-empty type names".to_string(),
            ));
        }
        if domain_type != wire_type && mapper.is_none() {
            return Err(PipelineError::InvalidConfiguration(format!(
                "Type mapping {} -> {} names a distinct wire type but no mapper",
                domain_type, wire_type
            )));
        }

        Ok(Self {
            domain_type,
            wire_type,
            mapper,
        })
    }

    /// Creates an identity mapping (wire type equals domain type, no
    /// mapper).
    pub fn identity(type_name: impl Into<String>) -> Self {
        let name = type_name.into();
        Self {
            domain_type: name.clone(),
            wire_type: name,
            mapper: None,
        }
    }

    /// Gets the domain type name.
    pub fn domain_type(&self) -> &str {
        &self.domain_type
    }

    /// Gets the wire type name.
    pub fn wire_type(&self) -> &str {
        &self.wire_type
    }

    /// Gets the mapper identity, if any.
    pub fn mapper(&self) -> Option<&str> {
        self.mapper.as_deref()
    }

    /// Whether the mapping is the identity on its type.
    pub fn is_identity(&self) -> bool {
        self.domain_type == self.wire_type
    }

    /// Whether decoding/encoding through this mapping requires a mapper.
    pub fn requires_mapper(&self) -> bool {
        !self.is_identity()
    }

    /// Simple (unqualified) name of the wire type.
    pub fn wire_simple_name(&self) -> &str {
        simple_name(&self.wire_type)
    }

    /// Simple (unqualified) name of the domain type.
    pub fn domain_simple_name(&self) -> &str {
        simple_name(&self.domain_type)
    }
}

impl Display for TypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            write!(f, "{}", self.domain_type)
        } else {
            write!(f, "{} -> {}", self.domain_type, self.wire_type)
        }
    }
}

/// Strips package qualification from a type name. Both `.`-separated and
/// `::`-separated qualifiers are recognised.
fn simple_name(qualified: &str) -> &str {
    let after_path = qualified.rsplit("::").next().unwrap_or(qualified);
    after_path.rsplit('.').next().unwrap_or(after_path)
}
