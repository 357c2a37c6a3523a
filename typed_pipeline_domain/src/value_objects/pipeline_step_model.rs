// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Step Model
//!
//! Compile-time description of a step derived from user declarations. The
//! model is what the code-generation pipeline consumes to emit typed
//! client and server stubs, and what the executor consumes to validate the
//! type chain and to type synthetic observer steps during aspect
//! expansion. The executor itself treats every step as a black-box
//! function; the model only affects transport selection and validation.

use serde::{Deserialize, Serialize};

use crate::value_objects::step_shape::StepShape;
use crate::value_objects::type_mapping::TypeMapping;
use crate::PipelineError;

/// Transport artifacts that can be generated for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationTarget {
    GrpcService,
    GrpcClient,
    RestResource,
    RestClient,
}

/// Compile-time step descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStepModel {
    service_name: String,
    service_package: String,
    input: TypeMapping,
    output: TypeMapping,
    shape: StepShape,
    enabled_targets: Vec<GenerationTarget>,
}

impl PipelineStepModel {
    /// Creates a new step model.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidConfiguration` when the service name
    /// is empty.
    pub fn new(
        service_name: impl Into<String>,
        service_package: impl Into<String>,
        input: TypeMapping,
        output: TypeMapping,
        shape: StepShape,
        enabled_targets: Vec<GenerationTarget>,
    ) -> Result<Self, PipelineError> {
        let service_name = service_name.into();
        if service_name.is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "Step model requires a non-empty service name".to_string(),
            ));
        }
        Ok(Self {
            service_name,
            service_package: service_package.into(),
            input,
            output,
            shape,
            enabled_targets,
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn service_package(&self) -> &str {
        &self.service_package
    }

    pub fn input(&self) -> &TypeMapping {
        &self.input
    }

    pub fn output(&self) -> &TypeMapping {
        &self.output
    }

    pub fn shape(&self) -> StepShape {
        self.shape
    }

    pub fn enabled_targets(&self) -> &[GenerationTarget] {
        &self.enabled_targets
    }

    /// Whether any remote artifact (client or server, gRPC or REST) is
    /// enabled for this step.
    pub fn has_remote_target(&self) -> bool {
        !self.enabled_targets.is_empty()
    }

    /// Whether the given target is enabled.
    pub fn targets(&self, target: GenerationTarget) -> bool {
        self.enabled_targets.contains(&target)
    }
}
