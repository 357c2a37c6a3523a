// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Startup readiness: no input is admitted before every remote client
//! step reports healthy.

use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use typed_pipeline::infrastructure::aspects::expansion::ObserverRegistry;
use typed_pipeline::infrastructure::runtime::executor::RegisteredStep;
use typed_pipeline_bootstrap::shutdown::CancellationToken;
use typed_pipeline_domain::{ItemStream, PipelineError, PipelineItem, StepHandler, StepShape};

use super::support::{self, FixedHealthTransport};

fn remote_passthrough(name: &str, order: u32, healthy: bool) -> RegisteredStep {
    let transport = if healthy {
        FixedHealthTransport::healthy()
    } else {
        FixedHealthTransport::unhealthy()
    };
    RegisteredStep::local(
        support::step(name, order, StepShape::UnaryUnary),
        StepHandler::UnaryUnary(Arc::new(
            typed_pipeline::infrastructure::services::passthrough::PassthroughStep,
        )),
    )
    .with_transport(transport)
}

#[tokio::test]
async fn test_unhealthy_client_times_out_startup() {
    let (executor, _) = support::assemble(
        vec![remote_passthrough("remote", 1, false)],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    // Probe input: polling it would flip the flag.
    let polled = Arc::new(AtomicBool::new(false));
    let probe = polled.clone();
    let input: ItemStream = futures::stream::iter([Ok(PipelineItem::new(0, json!(1)))])
        .inspect(move |_| {
            probe.store(true, Ordering::SeqCst);
        })
        .boxed();

    let err = executor
        .execute_collect(input, CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        PipelineError::StartupTimeout(message) => assert!(message.contains("remote")),
        other => panic!("unexpected error: {other:?}"),
    }
    // The deadline expired before any input was admitted.
    assert!(!polled.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_healthy_clients_admit_input() {
    let (executor, _) = support::assemble(
        vec![
            remote_passthrough("remote-a", 1, true),
            remote_passthrough("remote-b", 2, true),
        ],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    let (outputs, summary) = executor
        .execute_items(support::items(vec![json!(1)]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(summary.entered, 1);
}

#[tokio::test]
async fn test_local_only_pipelines_skip_the_gate() {
    let started = std::time::Instant::now();
    let (executor, _) = support::assemble(
        vec![RegisteredStep::local(
            support::step("local", 1, StepShape::UnaryUnary),
            StepHandler::UnaryUnary(Arc::new(
                typed_pipeline::infrastructure::services::passthrough::PassthroughStep,
            )),
        )],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    executor
        .execute_items(support::items(vec![json!(1)]), CancellationToken::new())
        .await
        .unwrap();

    // No readiness polling happened.
    assert!(started.elapsed() < std::time::Duration::from_millis(400));
}
