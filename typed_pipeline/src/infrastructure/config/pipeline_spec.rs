// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Topology Document
//!
//! The YAML document describing a pipeline: application identity, the
//! ordered step declarations with their cardinalities and type names, and
//! optional aspect declarations. The document is what the code generator
//! consumes; at runtime it lowers onto `Step` entities,
//! `PipelineStepModel` descriptors, and `PipelineAspect` declarations.
//!
//! ```yaml
//! appName: orders
//! basePackage: com.acme.orders
//! steps:
//!   - name: normalize
//!     cardinality: ONE_TO_ONE
//!     inputTypeName: Order
//!     inputFields: [id, body]
//!     outputTypeName: NormalizedOrder
//!     outputFields: [id, body]
//! aspects:
//!   - name: log
//!     scope: GLOBAL
//!     position: BEFORE_STEP
//!     order: 1
//!     config:
//!       pluginImplementationClass: DebugObserver
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use typed_pipeline_domain::value_objects::pipeline_step_model::{
    GenerationTarget, PipelineStepModel,
};
use typed_pipeline_domain::value_objects::step_order::StepOrder;
use typed_pipeline_domain::value_objects::type_mapping::TypeMapping;
use typed_pipeline_domain::{
    AspectPosition, AspectScope, Cardinality, ExecutionMode, OrderingHint, PipelineAspect,
    PipelineError, Step, ThreadSafety,
};

use crate::infrastructure::config::defaults::PipelineDefaults;

/// One step declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    pub name: String,
    pub cardinality: Cardinality,
    pub input_type_name: String,
    #[serde(default)]
    pub input_fields: Vec<String>,
    pub output_type_name: String,
    #[serde(default)]
    pub output_fields: Vec<String>,

    /// Wire form of the input type; requires `inputMapper` when distinct.
    #[serde(default)]
    pub wire_input_type_name: Option<String>,
    #[serde(default)]
    pub wire_output_type_name: Option<String>,
    #[serde(default)]
    pub input_mapper: Option<String>,
    #[serde(default)]
    pub output_mapper: Option<String>,

    #[serde(default)]
    pub ordering: Option<OrderingHint>,
    #[serde(default)]
    pub thread_safety: Option<ThreadSafety>,
    #[serde(default)]
    pub cache_key_generator: Option<String>,
    #[serde(default)]
    pub enabled_targets: Vec<GenerationTarget>,
}

/// One aspect declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectSpec {
    pub name: String,
    pub scope: AspectScope,
    pub position: AspectPosition,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub config: HashMap<String, String>,
}

/// The whole topology document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    pub app_name: String,
    pub base_package: String,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
    #[serde(default)]
    pub aspects: Vec<AspectSpec>,
}

impl PipelineSpec {
    /// Parses a topology document from YAML.
    pub fn from_yaml(document: &str) -> Result<Self, PipelineError> {
        let spec: PipelineSpec = serde_yaml::from_str(document).map_err(|e| {
            PipelineError::invalid_config(format!("Invalid pipeline document: {}", e))
        })?;
        spec.validate()?;
        Ok(spec)
    }

    /// Loads and parses a topology document from disk.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let document = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::invalid_config(format!(
                "Cannot read pipeline document {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&document)
    }

    /// Structural validation: identity present, step names unique.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.app_name.trim().is_empty() {
            return Err(PipelineError::invalid_config("appName must not be empty"));
        }
        if self.base_package.trim().is_empty() {
            return Err(PipelineError::invalid_config(
                "basePackage must not be empty",
            ));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                return Err(PipelineError::invalid_config("step name must not be empty"));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(PipelineError::invalid_config(format!(
                    "duplicate step name '{}'",
                    step.name
                )));
            }
        }
        Ok(())
    }

    /// Lowers the step declarations onto domain entities and models, in
    /// declaration order.
    pub fn lower_steps(
        &self,
        defaults: &PipelineDefaults,
    ) -> Result<Vec<(Step, PipelineStepModel)>, PipelineError> {
        let mut lowered = Vec::with_capacity(self.steps.len());
        let mut order = StepOrder::first();

        for spec in &self.steps {
            let shape = spec.cardinality.to_shape();
            let mut step = Step::new(spec.name.clone(), order, shape)?;
            if let Some(ordering) = spec.ordering {
                step = step.with_ordering(ordering);
            }
            if let Some(thread_safety) = spec.thread_safety {
                step = step.with_thread_safety(thread_safety);
            }
            if let Some(generator) = &spec.cache_key_generator {
                step = step.with_cache_key_generator(generator.clone());
            }
            if defaults.run_with_virtual_threads {
                step = step.with_execution_mode(ExecutionMode::VirtualThreads);
            }

            let input = match &spec.wire_input_type_name {
                Some(wire) => {
                    TypeMapping::new(spec.input_type_name.clone(), wire.clone(), spec.input_mapper.clone())?
                }
                None => TypeMapping::identity(spec.input_type_name.clone()),
            };
            let output = match &spec.wire_output_type_name {
                Some(wire) => TypeMapping::new(
                    spec.output_type_name.clone(),
                    wire.clone(),
                    spec.output_mapper.clone(),
                )?,
                None => TypeMapping::identity(spec.output_type_name.clone()),
            };

            let model = PipelineStepModel::new(
                service_name_for(&spec.name),
                self.base_package.clone(),
                input,
                output,
                shape,
                spec.enabled_targets.clone(),
            )?;

            lowered.push((step, model));
            order = order.next()?;
        }

        Ok(lowered)
    }

    /// Lowers the aspect declarations.
    pub fn lower_aspects(&self) -> Result<Vec<PipelineAspect>, PipelineError> {
        self.aspects
            .iter()
            .map(|spec| {
                PipelineAspect::new(
                    spec.name.clone(),
                    spec.scope,
                    spec.position,
                    spec.order,
                    spec.config.clone(),
                )
            })
            .collect()
    }
}

/// Service identity derived from a step name: `normalize` ->
/// `NormalizeService`.
fn service_name_for(step_name: &str) -> String {
    let pascal: String = step_name
        .split(['_', '-', ' '])
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    format!("{}Service", pascal)
}
