// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Aspect Entity
//!
//! A cross-cutting concern descriptor. Aspects are declared alongside the
//! pipeline topology and expanded at assembly time into synthetic
//! side-effect steps placed before or after the user steps they target.
//! The expansion pass itself lives in the runtime crate; this entity only
//! carries the declaration.
//!
//! An aspect's `config` map must name a `pluginImplementationClass` (the
//! registry key of the observer implementation). Step-scoped aspects also
//! carry a `targetSteps` entry listing the user steps they apply to.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display};

use crate::PipelineError;

/// Config key naming the observer plugin implementation.
pub const CONFIG_PLUGIN_IMPLEMENTATION_CLASS: &str = "pluginImplementationClass";
/// Config key listing target step names for STEP-scoped aspects.
pub const CONFIG_TARGET_STEPS: &str = "targetSteps";
/// Config key naming an optional provider class.
pub const CONFIG_PROVIDER_CLASS: &str = "providerClass";

/// Which steps an aspect applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AspectScope {
    /// Apply to every user step in the pipeline.
    Global,
    /// Apply only to the steps listed in `targetSteps`.
    Steps,
}

/// Where the synthetic step is placed relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AspectPosition {
    BeforeStep,
    AfterStep,
}

/// Cross-cutting concern declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineAspect {
    name: String,
    scope: AspectScope,
    position: AspectPosition,
    order: i32,
    config: HashMap<String, String>,
}

impl PipelineAspect {
    /// Creates a new aspect declaration.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidConfiguration` when the name is
    /// empty.
    pub fn new(
        name: impl Into<String>,
        scope: AspectScope,
        position: AspectPosition,
        order: i32,
        config: HashMap<String, String>,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        if name.is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "Aspect name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            scope,
            position,
            order,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> AspectScope {
        self.scope
    }

    pub fn position(&self) -> AspectPosition {
        self.position
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn config(&self) -> &HashMap<String, String> {
        &self.config
    }

    /// The observer plugin implementation this aspect dispatches to.
    pub fn plugin_implementation_class(&self) -> Option<&str> {
        self.config
            .get(CONFIG_PLUGIN_IMPLEMENTATION_CLASS)
            .map(String::as_str)
    }

    /// Optional provider class named in the config.
    pub fn provider_class(&self) -> Option<&str> {
        self.config.get(CONFIG_PROVIDER_CLASS).map(String::as_str)
    }

    /// Target step names for STEP-scoped aspects. The config value is a
    /// comma-separated list; surrounding whitespace is ignored.
    pub fn target_steps(&self) -> Vec<&str> {
        self.config
            .get(CONFIG_TARGET_STEPS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether this aspect applies to the named user step.
    pub fn applies_to(&self, step_name: &str) -> bool {
        match self.scope {
            AspectScope::Global => true,
            AspectScope::Steps => self.target_steps().contains(&step_name),
        }
    }

    /// Validates the declaration invariants that do not require the step
    /// list: a plugin implementation class must be named.
    pub fn validate(&self) -> Result<(), PipelineError> {
        match self.plugin_implementation_class() {
            Some(class) if !class.trim().is_empty() => Ok(()),
            _ => Err(PipelineError::InvalidConfiguration(format!(
                "Aspect '{}' does not name a pluginImplementationClass",
                self.name
            ))),
        }
    }
}

impl Display for PipelineAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "aspect '{}' ({:?}/{:?}, order {})",
            self.name, self.scope, self.position, self.order
        )
    }
}
