// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Backpressure buffer gauges through an assembled pipeline.

use serde_json::json;
use std::time::Duration;

use typed_pipeline::infrastructure::aspects::expansion::ObserverRegistry;
use typed_pipeline::infrastructure::runtime::executor::RegisteredStep;
use typed_pipeline_bootstrap::shutdown::CancellationToken;
use typed_pipeline_domain::{PipelineItem, StepHandler, StepShape};

use super::support::{self, RecordingStep};

#[tokio::test]
async fn test_buffer_gauges_with_slow_consumer() {
    // Fast producer stage, slow consumer stage, capacity 4, 3 items:
    // steady-state queued depth never exceeds production, and the
    // capacity gauge reports the configured bound.
    fn slow(_item: &PipelineItem) -> Duration {
        Duration::from_millis(40)
    }

    let producer = RecordingStep::new();
    let consumer = RecordingStep::with_delay(slow);

    let mut defaults = support::fast_defaults();
    defaults.buffer_capacity = 4;

    let (executor, metrics) = support::assemble(
        vec![
            RegisteredStep::local(
                support::step("producer", 1, StepShape::UnaryUnary),
                StepHandler::UnaryUnary(producer),
            ),
            RegisteredStep::local(
                support::step("consumer", 2, StepShape::UnaryUnary),
                StepHandler::UnaryUnary(consumer),
            ),
        ],
        Vec::new(),
        &ObserverRegistry::new(),
        &defaults,
    );

    let gauges = metrics.clone();
    let run = tokio::spawn(async move {
        executor
            .execute_items(
                support::items(vec![json!(1), json!(2), json!(3)]),
                CancellationToken::new(),
            )
            .await
    });

    // Let the producer run ahead of the slow consumer, then sample the
    // gauges mid-run. The buffer sits downstream of the producer stage.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let queued = gauges.buffer_queued_gauge("producer").get();
    let capacity = gauges.buffer_capacity_gauge("producer").get();
    assert_eq!(capacity, 4);
    assert!(queued <= 3, "queued depth {queued} exceeds production");
    assert!(queued >= 0);

    let (outputs, summary) = run.await.unwrap().unwrap();
    assert_eq!(outputs.len(), 3);
    assert_eq!(summary.entered, 3);
    assert_eq!(summary.emitted, 3);

    // Drained after completion.
    assert_eq!(gauges.buffer_queued_gauge("producer").get(), 0);
}

#[tokio::test]
async fn test_no_items_are_dropped_under_pressure() {
    // Capacity 1 with a slow consumer forces the producer to block on
    // every send; everything still arrives.
    fn slow(_item: &PipelineItem) -> Duration {
        Duration::from_millis(5)
    }

    let consumer = RecordingStep::with_delay(slow);

    let mut defaults = support::fast_defaults();
    defaults.buffer_capacity = 1;

    let (executor, _) = support::assemble(
        vec![
            RegisteredStep::local(
                support::step("producer", 1, StepShape::UnaryUnary),
                StepHandler::UnaryUnary(RecordingStep::new()),
            ),
            RegisteredStep::local(
                support::step("consumer", 2, StepShape::UnaryUnary),
                StepHandler::UnaryUnary(consumer.clone()),
            ),
        ],
        Vec::new(),
        &ObserverRegistry::new(),
        &defaults,
    );

    let input: Vec<_> = (0..20).map(|i| json!(i)).collect();
    let (outputs, summary) = executor
        .execute_items(support::items(input), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outputs.len(), 20);
    assert_eq!(summary.entered, 20);
    assert_eq!(summary.emitted, 20);
    assert_eq!(consumer.seen().len(), 20);
}
