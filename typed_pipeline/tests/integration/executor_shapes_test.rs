// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shape adaptation, ordering guarantees, assembly validation, and
//! cancellation through the executor.

use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use typed_pipeline::infrastructure::aspects::expansion::ObserverRegistry;
use typed_pipeline::infrastructure::runtime::executor::{RegisteredStep, StepRegistry};
use typed_pipeline::infrastructure::runtime::parallelism::ParallelismPolicy;
use typed_pipeline_bootstrap::shutdown::CancellationToken;
use typed_pipeline_domain::value_objects::step_order::StepOrder;
use typed_pipeline_domain::{
    ItemStream, OrderingHint, PipelineError, PipelineItem, Step, StepHandler, StepShape,
    StreamingStreamingService, StreamingUnaryService, ThreadSafety,
};

use super::support::{self, unary_entry, ExpanderStep, RecordingStep};

/// Counts upstream items into a single output.
struct CountReduction;

#[async_trait::async_trait]
impl StreamingUnaryService for CountReduction {
    async fn apply(&self, mut items: ItemStream) -> Result<PipelineItem, PipelineError> {
        let mut count = 0i64;
        while let Some(next) = items.next().await {
            next?;
            count += 1;
        }
        Ok(PipelineItem::new(0, json!(count)))
    }
}

/// Tags every item in a stream.
struct TaggingTransform;

#[async_trait::async_trait]
impl StreamingStreamingService for TaggingTransform {
    async fn apply(&self, items: ItemStream) -> Result<ItemStream, PipelineError> {
        Ok(items
            .map(|next| {
                next.map(|item| {
                    let tagged = format!("{}!", item.payload().as_str().unwrap_or_default());
                    item.with_payload(json!(tagged))
                })
            })
            .boxed())
    }
}

#[tokio::test]
async fn test_expansion_reads_in_order_under_strict_advised() {
    // UNARY_STREAMING applied to 42 produces 42-1, 42-2, 42-3, and the
    // downstream stage observes them in that order.
    let expander_step = support::step("expand", 1, StepShape::UnaryStreaming)
        .with_ordering(OrderingHint::StrictAdvised);
    let recorder = RecordingStep::new();
    let recorder_step =
        support::step("record", 2, StepShape::UnaryUnary).with_ordering(OrderingHint::StrictAdvised);

    let mut defaults = support::fast_defaults();
    defaults.parallelism = Some(ParallelismPolicy::Auto);

    let (executor, _) = support::assemble(
        vec![
            RegisteredStep::local(expander_step, StepHandler::UnaryStreaming(Arc::new(ExpanderStep))),
            RegisteredStep::local(recorder_step, StepHandler::UnaryUnary(recorder.clone())),
        ],
        Vec::new(),
        &ObserverRegistry::new(),
        &defaults,
    );

    let (outputs, _) = executor
        .execute_items(support::items(vec![json!(42)]), CancellationToken::new())
        .await
        .unwrap();

    let expected = vec![json!("42-1"), json!("42-2"), json!("42-3")];
    assert_eq!(
        outputs.iter().map(|i| i.payload().clone()).collect::<Vec<_>>(),
        expected
    );
    assert_eq!(recorder.seen(), expected);
}

#[tokio::test]
async fn test_strict_ordering_survives_parallel_execution() {
    // Later items finish first (inverted delays), but an Ordered stage
    // still emits in input order.
    fn inverted_delay(item: &PipelineItem) -> Duration {
        Duration::from_millis(30u64.saturating_sub(item.sequence() * 10))
    }

    let recorder = RecordingStep::with_delay(inverted_delay);
    let step = support::step("slow", 1, StepShape::UnaryUnary)
        .with_ordering(OrderingHint::StrictAdvised)
        .with_thread_safety(ThreadSafety::Safe);

    let mut defaults = support::fast_defaults();
    defaults.parallelism = Some(ParallelismPolicy::Parallel);

    let (executor, _) = support::assemble(
        vec![RegisteredStep::local(
            step,
            StepHandler::UnaryUnary(recorder.clone()),
        )],
        Vec::new(),
        &ObserverRegistry::new(),
        &defaults,
    );

    let input = support::items(vec![json!("a"), json!("b"), json!("c"), json!("d")]);
    let (outputs, _) = executor
        .execute_items(input, CancellationToken::new())
        .await
        .unwrap();

    let sequences: Vec<u64> = outputs.iter().map(PipelineItem::sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_four_shape_pipeline_end_to_end() {
    // upper -> expand (x3) -> tag -> count: 2 inputs become 6 children.
    struct Upper;

    #[async_trait::async_trait]
    impl typed_pipeline_domain::UnaryUnaryService for Upper {
        async fn apply(&self, item: PipelineItem) -> Result<PipelineItem, PipelineError> {
            let upper = item
                .payload()
                .as_str()
                .map(str::to_uppercase)
                .unwrap_or_default();
            Ok(item.with_payload(json!(upper)))
        }
    }

    struct NumberedExpander;

    #[async_trait::async_trait]
    impl typed_pipeline_domain::UnaryStreamingService for NumberedExpander {
        async fn apply(&self, item: PipelineItem) -> Result<ItemStream, PipelineError> {
            let base = item.payload().as_str().unwrap_or_default().to_string();
            let children: Vec<_> = (1..=3)
                .map(|i| Ok(item.child(i, json!(format!("{base}-{i}")))))
                .collect();
            Ok(futures::stream::iter(children).boxed())
        }
    }

    let (executor, _) = support::assemble(
        vec![
            RegisteredStep::local(
                support::step("upper", 1, StepShape::UnaryUnary),
                StepHandler::UnaryUnary(Arc::new(Upper)),
            ),
            RegisteredStep::local(
                support::step("expand", 2, StepShape::UnaryStreaming),
                StepHandler::UnaryStreaming(Arc::new(NumberedExpander)),
            ),
            RegisteredStep::local(
                support::step("tag", 3, StepShape::StreamingStreaming),
                StepHandler::StreamingStreaming(Arc::new(TaggingTransform)),
            ),
            RegisteredStep::local(
                support::step("count", 4, StepShape::StreamingUnary),
                StepHandler::StreamingUnary(Arc::new(CountReduction)),
            ),
        ],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    let (outputs, summary) = executor
        .execute_items(
            support::items(vec![json!("a"), json!("b")]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].payload(), &json!(6));
    assert_eq!(summary.entered, 2);
    assert_eq!(summary.emitted, 1);
}

#[tokio::test]
async fn test_declared_order_beats_registration_order() {
    let first = RecordingStep::new();
    let second = RecordingStep::new();

    // Registered out of order; declared StepOrder decides.
    let (executor, _) = support::assemble(
        vec![
            RegisteredStep::local(
                support::step("second", 2, StepShape::UnaryUnary),
                StepHandler::UnaryUnary(second.clone()),
            ),
            RegisteredStep::local(
                support::step("first", 1, StepShape::UnaryUnary),
                StepHandler::UnaryUnary(first.clone()),
            ),
        ],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    assert_eq!(executor.stage_names(), vec!["first", "second"]);

    executor
        .execute_items(support::items(vec![json!(1)]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.seen().len(), 1);
    assert_eq!(second.seen().len(), 1);
}

#[test]
fn test_type_chain_mismatch_fails_assembly() {
    let metrics = support::metrics();
    let flusher = support::flusher(&metrics);
    let mut registry = StepRegistry::new();
    registry.register(unary_entry(
        "produce",
        1,
        Arc::new(typed_pipeline::infrastructure::services::passthrough::PassthroughStep),
        "Order",
        "Invoice",
    ));
    registry.register(unary_entry(
        "consume",
        2,
        Arc::new(typed_pipeline::infrastructure::services::passthrough::PassthroughStep),
        "Order",
        "Order",
    ));

    let err = typed_pipeline::infrastructure::runtime::executor::PipelineExecutor::assemble(
        registry,
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
        metrics,
        flusher,
    )
    .unwrap_err();

    match err {
        PipelineError::IncompatibleShape(message) => {
            assert!(message.contains("produce"));
            assert!(message.contains("consume"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_empty_registry_fails_assembly() {
    let metrics = support::metrics();
    let flusher = support::flusher(&metrics);
    let err = typed_pipeline::infrastructure::runtime::executor::PipelineExecutor::assemble(
        StepRegistry::new(),
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
        metrics,
        flusher,
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
}

#[test]
fn test_strict_required_with_parallel_policy_fails_assembly() {
    let metrics = support::metrics();
    let flusher = support::flusher(&metrics);
    let mut registry = StepRegistry::new();
    registry.register(RegisteredStep::local(
        Step::new("strict", StepOrder::first(), StepShape::UnaryUnary)
            .unwrap()
            .with_ordering(OrderingHint::StrictRequired),
        StepHandler::UnaryUnary(Arc::new(
            typed_pipeline::infrastructure::services::passthrough::PassthroughStep,
        )),
    ));

    let mut defaults = support::fast_defaults();
    defaults.parallelism = Some(ParallelismPolicy::Parallel);

    let err = typed_pipeline::infrastructure::runtime::executor::PipelineExecutor::assemble(
        registry,
        Vec::new(),
        &ObserverRegistry::new(),
        &defaults,
        metrics,
        flusher,
    )
    .unwrap_err();

    match err {
        PipelineError::InvalidConfiguration(message) => assert!(message.contains("strict")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_token_terminates_run() {
    let (executor, _) = support::assemble(
        vec![RegisteredStep::local(
            support::step("noop", 1, StepShape::UnaryUnary),
            StepHandler::UnaryUnary(Arc::new(
                typed_pipeline::infrastructure::services::passthrough::PassthroughStep,
            )),
        )],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    let token = CancellationToken::new();
    token.cancel();

    let err = executor
        .execute_items(support::items(vec![json!(1), json!(2)]), token)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled(_)));
}
