// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The orchestrator surface end to end: input precedence, usage errors,
//! exit-code mapping, and telemetry flushing on every path.

use serde_json::json;
use std::sync::Arc;

use typed_pipeline::application::orchestrator::{InputSources, Orchestrator};
use typed_pipeline::infrastructure::aspects::expansion::ObserverRegistry;
use typed_pipeline::infrastructure::metrics::flush::TelemetryFlusher;
use typed_pipeline::infrastructure::runtime::executor::{
    PipelineExecutor, RegisteredStep, StepRegistry,
};
use typed_pipeline_bootstrap::shutdown::CancellationToken;
use typed_pipeline_bootstrap::ExitCode;
use typed_pipeline_domain::{PipelineError, StepHandler, StepShape};

use super::support;

fn orchestrator() -> (Orchestrator, Arc<TelemetryFlusher>) {
    let metrics = support::metrics();
    let flusher = Arc::new(TelemetryFlusher::new(metrics.clone()));

    let mut registry = StepRegistry::new();
    registry.register(RegisteredStep::local(
        support::step("noop", 1, StepShape::UnaryUnary),
        StepHandler::UnaryUnary(Arc::new(
            typed_pipeline::infrastructure::services::passthrough::PassthroughStep,
        )),
    ));

    let executor = PipelineExecutor::assemble(
        registry,
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
        metrics,
        flusher.clone(),
    )
    .unwrap();

    (Orchestrator::new(executor, flusher.clone()), flusher)
}

#[tokio::test]
async fn test_unary_object_input() {
    let (orchestrator, flusher) = orchestrator();
    let sources = InputSources {
        cli_input: Some(r#"{"id":"a"}"#.to_string()),
        ..Default::default()
    };

    let output = orchestrator
        .run(sources, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.document, json!({"id": "a"}));
    assert_eq!(output.summary.entered, 1);
    assert_eq!(output.summary.emitted, 1);
    assert!(flusher.is_flushed());
}

#[tokio::test]
async fn test_stream_array_input() {
    let (orchestrator, _) = orchestrator();
    let sources = InputSources {
        cli_input_list: Some(r#"[{"id":"a"},{"id":"b"}]"#.to_string()),
        ..Default::default()
    };

    let output = orchestrator
        .run(sources, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.document, json!([{"id": "a"}, {"id": "b"}]));
    assert_eq!(output.summary.entered, 2);
}

#[tokio::test]
async fn test_malformed_input_is_usage_failure() {
    let (orchestrator, flusher) = orchestrator();
    let sources = InputSources {
        cli_input: Some("not-json".to_string()),
        ..Default::default()
    };

    let err = orchestrator
        .run(sources, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidInput(_)));
    assert_eq!(ExitCode::from_pipeline_error(&err), ExitCode::UsageError);
    // Telemetry flushed even on the usage-error path.
    assert!(flusher.is_flushed());
}

#[tokio::test]
async fn test_missing_input_is_usage_failure() {
    let (orchestrator, _) = orchestrator();

    let err = orchestrator
        .run(InputSources::default(), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(ExitCode::from_pipeline_error(&err), ExitCode::UsageError);
}

#[tokio::test]
async fn test_env_input_used_when_cli_absent() {
    let (orchestrator, _) = orchestrator();
    let sources = InputSources {
        env_input: Some(r#"{"from":"env"}"#.to_string()),
        configured: Some(r#"{"from":"config"}"#.to_string()),
        ..Default::default()
    };

    let output = orchestrator
        .run(sources, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(output.document, json!({"from": "env"}));
}

#[tokio::test]
async fn test_ingress_mapper_applies_before_executor() {
    let metrics = support::metrics();
    let flusher = Arc::new(TelemetryFlusher::new(metrics.clone()));

    let mut registry = StepRegistry::new();
    registry.register(RegisteredStep::local(
        support::step("noop", 1, StepShape::UnaryUnary),
        StepHandler::UnaryUnary(Arc::new(
            typed_pipeline::infrastructure::services::passthrough::PassthroughStep,
        )),
    ));
    let executor = PipelineExecutor::assemble(
        registry,
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
        metrics,
        flusher.clone(),
    )
    .unwrap();

    let orchestrator = Orchestrator::new(executor, flusher).with_ingress_mapper(Arc::new(
        typed_pipeline::infrastructure::adapters::mapper::FnMapper(|payload: serde_json::Value| {
            Ok(json!({ "wire": payload }))
        }),
    ));

    let sources = InputSources {
        cli_input: Some(r#"{"id":"a"}"#.to_string()),
        ..Default::default()
    };
    let output = orchestrator
        .run(sources, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.document, json!({"wire": {"id": "a"}}));
}

#[test]
fn test_runtime_failure_exit_codes() {
    assert_eq!(
        ExitCode::from_pipeline_error(&PipelineError::pipeline_failure("boom")),
        ExitCode::Software
    );
    assert_eq!(
        ExitCode::from_pipeline_error(&PipelineError::startup_timeout("not healthy")),
        ExitCode::Unavailable
    );
    assert_eq!(
        ExitCode::from_pipeline_error(&PipelineError::invalid_config("bad aspect")),
        ExitCode::Config
    );
}
