// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Orchestrator Surface
//!
//! The minimal input driver over the pipeline executor. It resolves the
//! run input by precedence - CLI argument, `PIPELINE_INPUT` /
//! `PIPELINE_INPUT_LIST` environment variables, stdin, configured
//! property - parses it as a JSON object (unary orchestration) or a JSON
//! array (stream orchestration), maps DTO payloads to their wire form
//! for wire-typed pipelines, awaits execution, and renders the final
//! output document.
//!
//! Malformed or missing input is an `InvalidInput` error, which the
//! bootstrap layer maps to the `USAGE` exit code. Telemetry flushes on
//! every exit path, including input-resolution failures.

use serde_json::Value;
use std::io::{IsTerminal, Read};
use std::sync::Arc;

use typed_pipeline_bootstrap::shutdown::CancellationToken;
use typed_pipeline_domain::{PipelineError, PipelineItem};

use crate::infrastructure::adapters::mapper::ItemMapper;
use crate::infrastructure::metrics::flush::TelemetryFlusher;
use crate::infrastructure::runtime::executor::{PipelineExecutor, RunSummary};

/// Environment variable carrying a unary input document.
pub const ENV_PIPELINE_INPUT: &str = "PIPELINE_INPUT";
/// Environment variable carrying a stream input document.
pub const ENV_PIPELINE_INPUT_LIST: &str = "PIPELINE_INPUT_LIST";

/// A resolved, parsed run input.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestrationInput {
    /// A single JSON object: a one-item run.
    Unary(Value),
    /// A JSON array: a stream run.
    Stream(Vec<Value>),
}

impl OrchestrationInput {
    /// Items entering the executor, with ingestion sequence numbers.
    pub fn into_items(self) -> Vec<PipelineItem> {
        match self {
            OrchestrationInput::Unary(document) => vec![PipelineItem::new(0, document)],
            OrchestrationInput::Stream(documents) => documents
                .into_iter()
                .enumerate()
                .map(|(index, document)| PipelineItem::new(index as u64, document))
                .collect(),
        }
    }

    pub fn is_unary(&self) -> bool {
        matches!(self, OrchestrationInput::Unary(_))
    }
}

/// The raw input candidates, in precedence order.
///
/// Collected eagerly so the resolution logic is a pure function (and
/// therefore testable without a process environment).
#[derive(Debug, Default, Clone)]
pub struct InputSources {
    pub cli_input: Option<String>,
    pub cli_input_list: Option<String>,
    pub env_input: Option<String>,
    pub env_input_list: Option<String>,
    pub stdin: Option<String>,
    pub configured: Option<String>,
}

impl InputSources {
    /// Gathers candidates from the process: CLI flags, environment, stdin
    /// (only when piped), and the configured property.
    pub fn from_process(
        cli_input: Option<String>,
        cli_input_list: Option<String>,
        configured: Option<String>,
    ) -> Self {
        let stdin_present = cli_input.is_none()
            && cli_input_list.is_none()
            && std::env::var(ENV_PIPELINE_INPUT).is_err()
            && std::env::var(ENV_PIPELINE_INPUT_LIST).is_err()
            && !std::io::stdin().is_terminal();
        let stdin = if stdin_present {
            let mut buffer = String::new();
            match std::io::stdin().read_to_string(&mut buffer) {
                Ok(_) if !buffer.trim().is_empty() => Some(buffer),
                _ => None,
            }
        } else {
            None
        };

        Self {
            cli_input,
            cli_input_list,
            env_input: std::env::var(ENV_PIPELINE_INPUT).ok(),
            env_input_list: std::env::var(ENV_PIPELINE_INPUT_LIST).ok(),
            stdin,
            configured,
        }
    }
}

/// Parses one input document: object, array, or rejection.
pub fn parse_input_document(raw: &str) -> Result<OrchestrationInput, PipelineError> {
    let document: Value = serde_json::from_str(raw.trim())
        .map_err(|e| PipelineError::invalid_input(format!("Input is not valid JSON: {}", e)))?;

    match document {
        Value::Object(_) => Ok(OrchestrationInput::Unary(document)),
        Value::Array(elements) => {
            if let Some(first) = elements.first() {
                let kind = json_kind(first);
                if let Some(mixed) = elements.iter().find(|e| json_kind(e) != kind) {
                    return Err(PipelineError::invalid_input(format!(
                        "Input array mixes {} and {} elements",
                        kind,
                        json_kind(mixed)
                    )));
                }
            }
            Ok(OrchestrationInput::Stream(elements))
        }
        other => Err(PipelineError::invalid_input(format!(
            "Input must be a JSON object or array, got {}",
            json_kind(&other)
        ))),
    }
}

/// Parses a document that must be an array (the `--input-list` channel).
fn parse_input_list(raw: &str) -> Result<OrchestrationInput, PipelineError> {
    match parse_input_document(raw)? {
        OrchestrationInput::Stream(elements) => Ok(OrchestrationInput::Stream(elements)),
        OrchestrationInput::Unary(_) => Err(PipelineError::invalid_input(
            "The input list must be a JSON array",
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolves the run input by source precedence.
///
/// The first present candidate wins; a malformed winning candidate is a
/// usage error (no fall-through to later sources).
pub fn resolve_input(sources: InputSources) -> Result<OrchestrationInput, PipelineError> {
    if let Some(raw) = sources.cli_input {
        return parse_input_document(&raw);
    }
    if let Some(raw) = sources.cli_input_list {
        return parse_input_list(&raw);
    }
    if let Some(raw) = sources.env_input {
        return parse_input_document(&raw);
    }
    if let Some(raw) = sources.env_input_list {
        return parse_input_list(&raw);
    }
    if let Some(raw) = sources.stdin {
        return parse_input_document(&raw);
    }
    if let Some(raw) = sources.configured {
        return parse_input_document(&raw);
    }
    Err(PipelineError::invalid_input(
        "No input provided: pass --input/--input-list, set PIPELINE_INPUT, pipe a document, \
         or configure an input property",
    ))
}

/// What one orchestrated run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The final output document: the single payload for unary runs, an
    /// array of payloads for stream runs.
    pub document: Value,
    pub summary: RunSummary,
}

/// The input driver over an assembled executor.
pub struct Orchestrator {
    executor: PipelineExecutor,
    flusher: Arc<TelemetryFlusher>,
    ingress_mapper: Option<Arc<dyn ItemMapper>>,
}

impl Orchestrator {
    pub fn new(executor: PipelineExecutor, flusher: Arc<TelemetryFlusher>) -> Self {
        Self {
            executor,
            flusher,
            ingress_mapper: None,
        }
    }

    /// Installs the DTO-to-wire mapper applied to every input item before
    /// it enters the executor (wire-typed pipelines).
    pub fn with_ingress_mapper(mut self, mapper: Arc<dyn ItemMapper>) -> Self {
        self.ingress_mapper = Some(mapper);
        self
    }

    /// Resolves the input, runs the pipeline to completion, and renders
    /// the output document. Telemetry flushes on every path.
    pub async fn run(
        &self,
        sources: InputSources,
        token: CancellationToken,
    ) -> Result<RunOutput, PipelineError> {
        let input = match resolve_input(sources) {
            Ok(input) => input,
            Err(error) => {
                self.flusher.flush();
                return Err(error);
            }
        };
        let unary = input.is_unary();

        let mut items = input.into_items();
        if let Some(mapper) = &self.ingress_mapper {
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                let wire = mapper.map(item.payload().clone()).map_err(|e| {
                    PipelineError::invalid_input(format!("Input does not map to wire form: {}", e))
                });
                match wire {
                    Ok(payload) => mapped.push(item.with_payload(payload)),
                    Err(error) => {
                        self.flusher.flush();
                        return Err(error);
                    }
                }
            }
            items = mapped;
        }

        // The executor flushes telemetry on its own exit paths.
        let (outputs, summary) = self.executor.execute_items(items, token).await?;

        let document = if unary {
            outputs
                .into_iter()
                .next()
                .map(PipelineItem::into_payload)
                .unwrap_or(Value::Null)
        } else {
            Value::Array(
                outputs
                    .into_iter()
                    .map(PipelineItem::into_payload)
                    .collect(),
            )
        };

        Ok(RunOutput { document, summary })
    }
}
