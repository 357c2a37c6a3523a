// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Item Mappers
//!
//! Object-to-object mapping at the wire boundary. A `TypeMapping` that
//! names distinct domain and wire types references a mapper by identity;
//! the registry resolves that identity at assembly time so a missing
//! mapper is a `ConfigurationError`, not a mid-run surprise. Identity
//! mappings resolve to no mapper and values cast straight through.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use typed_pipeline_domain::value_objects::type_mapping::TypeMapping;
use typed_pipeline_domain::PipelineError;

/// One direction of an object-to-object conversion.
pub trait ItemMapper: Send + Sync {
    /// Converts a payload document between representations.
    fn map(&self, payload: Value) -> Result<Value, PipelineError>;
}

impl std::fmt::Debug for dyn ItemMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<dyn ItemMapper>")
    }
}

/// Mapper identity -> implementation registry.
#[derive(Default, Clone)]
pub struct MapperRegistry {
    mappers: HashMap<String, Arc<dyn ItemMapper>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mapper under its identity.
    pub fn register(&mut self, identity: impl Into<String>, mapper: Arc<dyn ItemMapper>) {
        self.mappers.insert(identity.into(), mapper);
    }

    /// Resolves the mapper a type mapping requires.
    ///
    /// Identity mappings resolve to `None`. A mapping that requires a
    /// mapper which is not registered is a configuration error.
    pub fn resolve(
        &self,
        mapping: &TypeMapping,
    ) -> Result<Option<Arc<dyn ItemMapper>>, PipelineError> {
        if !mapping.requires_mapper() {
            return Ok(None);
        }
        let identity = mapping.mapper().ok_or_else(|| {
            PipelineError::invalid_config(format!(
                "Type mapping {} requires a mapper but names none",
                mapping
            ))
        })?;
        match self.mappers.get(identity) {
            Some(mapper) => Ok(Some(mapper.clone())),
            None => Err(PipelineError::invalid_config(format!(
                "Type mapping {} names unknown mapper '{}'",
                mapping, identity
            ))),
        }
    }
}

/// A mapper defined by a function.
pub struct FnMapper<F>(pub F);

impl<F> ItemMapper for FnMapper<F>
where
    F: Fn(Value) -> Result<Value, PipelineError> + Send + Sync,
{
    fn map(&self, payload: Value) -> Result<Value, PipelineError> {
        (self.0)(payload)
    }
}
