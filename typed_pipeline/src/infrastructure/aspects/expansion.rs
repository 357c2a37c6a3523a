// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Aspect Expansion
//!
//! The pre-execution compiler pass that rewrites the declared step
//! sequence into the executable one, interleaving synthetic side-effect
//! steps around the user steps that aspects target.
//!
//! ## Algorithm
//!
//! 1. Validate every aspect: a `pluginImplementationClass` must be named
//!    and resolvable in the observer registry.
//! 2. Partition aspects into GLOBAL and STEPS scope; sort each partition
//!    by `(position, order)`, ties broken by declaration order.
//! 3. When the pipeline has more than one user step, every `targetSteps`
//!    entry of a STEPS-scoped aspect must reference an existing step.
//! 4. For each user step in sequence: emit one synthetic observer per
//!    applicable BEFORE_STEP aspect (typed by the step's input mapping),
//!    the step itself, then one per AFTER_STEP aspect (typed by the
//!    output mapping).
//! 5. Deduplicate synthetics by `(serviceName, aspectName, position)`.
//!
//! ## Synthetic Identity
//!
//! `serviceName = "Observe" + PascalCase(aspectName) + messageName +
//! "SideEffectService"`, where `messageName` is the wire type's simple
//! name for remote steps and the domain type's simple name for local
//! steps. Synthetic steps are UNARY_UNARY, `sideEffect = true`, and
//! identity on the value stream.
//!
//! Expansion is idempotent: synthetic steps already present in the input
//! are passed through untouched (aspects never target them), and their
//! service names block regeneration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use typed_pipeline_domain::services::observer::SideEffectObserver;
use typed_pipeline_domain::value_objects::pipeline_step_model::PipelineStepModel;
use typed_pipeline_domain::value_objects::type_mapping::TypeMapping;
use typed_pipeline_domain::{
    AspectPosition, AspectScope, PipelineAspect, PipelineError, Step, StepHandler,
};

use crate::infrastructure::aspects::side_effect_step::SideEffectStep;
use crate::infrastructure::runtime::executor::RegisteredStep;

/// Explicit name -> implementation registry for observer plugins.
///
/// Aspect declarations reference plugins by class name
/// (`pluginImplementationClass`); the registry is built at startup, so
/// the expansion pass never reflects over anything.
#[derive(Default)]
pub struct ObserverRegistry {
    plugins: HashMap<String, Arc<dyn SideEffectObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer under its plugin class name.
    pub fn register(
        &mut self,
        plugin_class: impl Into<String>,
        observer: Arc<dyn SideEffectObserver>,
    ) {
        self.plugins.insert(plugin_class.into(), observer);
    }

    /// Resolves a plugin class name.
    pub fn resolve(&self, plugin_class: &str) -> Option<Arc<dyn SideEffectObserver>> {
        self.plugins.get(plugin_class).cloned()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Converts an aspect name to PascalCase: `log` -> `Log`,
/// `cache_lookup` -> `CacheLookup`.
fn pascal_case(name: &str) -> String {
    name.split(['_', '-', ' ', '.'])
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// The synthetic service name for an aspect observing a message type.
pub fn synthetic_service_name(aspect_name: &str, message_name: &str) -> String {
    format!(
        "Observe{}{}SideEffectService",
        pascal_case(aspect_name),
        message_name
    )
}

/// Resolves the message type a synthetic step observes at one position of
/// an anchor step.
fn message_name(
    entry: &RegisteredStep,
    position: AspectPosition,
    aspect_name: &str,
) -> Result<String, PipelineError> {
    let model = entry.model.as_ref().ok_or_else(|| {
        PipelineError::InvalidConfiguration(format!(
            "Step '{}' has no type model; aspect '{}' cannot type its synthetic step",
            entry.step.name(),
            aspect_name
        ))
    })?;
    let mapping = match position {
        AspectPosition::BeforeStep => model.input(),
        AspectPosition::AfterStep => model.output(),
    };
    let name = if entry.transport.is_some() {
        mapping.wire_simple_name()
    } else {
        mapping.domain_simple_name()
    };
    Ok(name.to_string())
}

/// Builds the synthetic registered step observing `message_name` at the
/// anchor's position.
fn synthetic_entry(
    anchor: &RegisteredStep,
    service_name: &str,
    message: &str,
    observer: Arc<dyn SideEffectObserver>,
) -> Result<RegisteredStep, PipelineError> {
    let step = Step::side_effect(service_name, anchor.step.order())?;
    let package = anchor
        .model
        .as_ref()
        .map(|m| m.service_package().to_string())
        .unwrap_or_default();
    let model = PipelineStepModel::new(
        service_name,
        package,
        TypeMapping::identity(message),
        TypeMapping::identity(message),
        step.shape(),
        Vec::new(),
    )?;
    Ok(RegisteredStep {
        step,
        handler: StepHandler::UnaryUnary(Arc::new(SideEffectStep::new(
            service_name,
            observer,
        ))),
        config: None,
        model: Some(model),
        transport: None,
    })
}

/// Runs the expansion pass.
pub fn expand(
    entries: Vec<RegisteredStep>,
    aspects: &[PipelineAspect],
    observers: &ObserverRegistry,
) -> Result<Vec<RegisteredStep>, PipelineError> {
    if aspects.is_empty() {
        return Ok(entries);
    }

    // Validate declarations and resolve plugins up front.
    let mut plugins: HashMap<&str, Arc<dyn SideEffectObserver>> = HashMap::new();
    for aspect in aspects {
        aspect.validate()?;
        let class = aspect.plugin_implementation_class().ok_or_else(|| {
            PipelineError::InvalidConfiguration(format!(
                "Aspect '{}' does not name a pluginImplementationClass",
                aspect.name()
            ))
        })?;
        let observer = observers.resolve(class).ok_or_else(|| {
            PipelineError::InvalidConfiguration(format!(
                "Aspect '{}' names unknown pluginImplementationClass '{}'",
                aspect.name(),
                class
            ))
        })?;
        plugins.insert(aspect.name(), observer);
    }

    // Partition by scope, keeping declaration order for tie-breaks.
    let mut global: Vec<(usize, &PipelineAspect)> = Vec::new();
    let mut scoped: Vec<(usize, &PipelineAspect)> = Vec::new();
    for (index, aspect) in aspects.iter().enumerate() {
        match aspect.scope() {
            AspectScope::Global => global.push((index, aspect)),
            AspectScope::Steps => scoped.push((index, aspect)),
        }
    }
    let sort_key = |entry: &(usize, &PipelineAspect)| {
        let (index, aspect) = *entry;
        (aspect.position(), aspect.order(), index)
    };
    global.sort_by_key(sort_key);
    scoped.sort_by_key(sort_key);

    // Validate step references of STEP-scoped aspects.
    let user_steps: Vec<&RegisteredStep> =
        entries.iter().filter(|e| !e.step.is_side_effect()).collect();
    let known_names: HashSet<&str> = user_steps.iter().map(|e| e.step.name()).collect();
    if user_steps.len() > 1 {
        for (_, aspect) in &scoped {
            for target in aspect.target_steps() {
                if !known_names.contains(target) {
                    return Err(PipelineError::InvalidConfiguration(format!(
                        "Aspect '{}' targets unknown step '{}'",
                        aspect.name(),
                        target
                    )));
                }
            }
        }
    }

    // Synthetic service names already present block regeneration.
    let existing: HashSet<String> = entries
        .iter()
        .filter(|e| e.step.is_side_effect())
        .map(|e| e.step.name().to_string())
        .collect();
    let mut emitted: HashSet<(String, String, AspectPosition)> = HashSet::new();

    let mut expanded: Vec<RegisteredStep> = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.step.is_side_effect() {
            expanded.push(entry);
            continue;
        }

        let applicable: Vec<&PipelineAspect> = global
            .iter()
            .chain(scoped.iter())
            .filter(|(_, aspect)| aspect.applies_to(entry.step.name()))
            .map(|(_, aspect)| *aspect)
            .collect();

        let mut push_synthetics =
            |position: AspectPosition,
             expanded: &mut Vec<RegisteredStep>,
             entry: &RegisteredStep|
             -> Result<(), PipelineError> {
                for aspect in applicable.iter().filter(|a| a.position() == position) {
                    let message = message_name(entry, position, aspect.name())?;
                    let service_name = synthetic_service_name(aspect.name(), &message);
                    if existing.contains(&service_name) {
                        continue;
                    }
                    let key = (service_name.clone(), aspect.name().to_string(), position);
                    if !emitted.insert(key) {
                        continue;
                    }
                    let observer = plugins.get(aspect.name()).cloned().ok_or_else(|| {
                        PipelineError::internal_error(format!(
                            "observer for aspect '{}' was not resolved",
                            aspect.name()
                        ))
                    })?;
                    expanded.push(synthetic_entry(entry, &service_name, &message, observer)?);
                }
                Ok(())
            };

        push_synthetics(AspectPosition::BeforeStep, &mut expanded, &entry)?;
        let after_anchor = entry.clone();
        expanded.push(entry);
        push_synthetics(AspectPosition::AfterStep, &mut expanded, &after_anchor)?;
    }

    Ok(expanded)
}
