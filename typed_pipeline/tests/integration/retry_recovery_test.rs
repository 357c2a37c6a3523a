// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Retry, dead-letter, and recovery semantics through the executor.

use serde_json::json;

use typed_pipeline::infrastructure::aspects::expansion::ObserverRegistry;
use typed_pipeline_bootstrap::shutdown::CancellationToken;
use typed_pipeline_domain::{PipelineError, StepHandler};

use super::support::{
    self, manual_config, unary_entry, AlwaysFailsStep, FlakyStep, OddDropStep, SalvageStep,
};

#[tokio::test]
async fn test_retry_succeeds_on_third_attempt() {
    let flaky = FlakyStep::new(2);
    let entry = unary_entry("flaky", 1, flaky.clone(), "Doc", "Doc")
        .with_config(manual_config(3, false));

    let (executor, _) = support::assemble(
        vec![entry],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    let (outputs, summary) = executor
        .execute_items(support::items(vec![json!("x")]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].payload(), &json!("x:attempt-3"));
    assert_eq!(flaky.calls(), 3);
    assert_eq!(summary.emitted, 1);
    assert_eq!(summary.recovered, 0);
}

#[tokio::test]
async fn test_exhaustion_with_recovery_passes_input_through() {
    let broken = AlwaysFailsStep::new();
    let entry = unary_entry("broken", 1, broken.clone(), "Doc", "Doc")
        .with_config(manual_config(2, true));

    let (executor, _) = support::assemble(
        vec![entry],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    let (outputs, summary) = executor
        .execute_items(support::items(vec![json!("x")]), CancellationToken::new())
        .await
        .unwrap();

    // retry_limit = 2 means exactly 3 invocations, then pass-through.
    assert_eq!(broken.calls(), 3);
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].payload(), &json!("x"));
    assert_eq!(summary.recovered, 1);
}

#[tokio::test]
async fn test_exhaustion_without_recovery_terminates_run() {
    let broken = AlwaysFailsStep::new();
    let entry = unary_entry("broken", 1, broken.clone(), "Doc", "Doc")
        .with_config(manual_config(1, false));

    let (executor, _) = support::assemble(
        vec![entry],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    let err = executor
        .execute_items(support::items(vec![json!("x")]), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::PipelineFailure(_)));
    assert_eq!(broken.calls(), 2);
}

#[tokio::test]
async fn test_dead_letter_replacement_is_emitted() {
    let entry = unary_entry("salvage", 1, std::sync::Arc::new(SalvageStep), "Doc", "Doc")
        .with_config(manual_config(0, false));

    let (executor, _) = support::assemble(
        vec![entry],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    let (outputs, _) = executor
        .execute_items(support::items(vec![json!("x")]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].payload(), &json!("salvaged"));
}

#[tokio::test]
async fn test_no_silent_loss_accounting() {
    // Odd payloads exhaust retries and are consumed by the dead-letter
    // handler; entered = emitted + dropped.
    let entry = unary_entry("odd-drop", 1, std::sync::Arc::new(OddDropStep), "Doc", "Doc")
        .with_config(manual_config(1, false));

    let (executor, _) = support::assemble(
        vec![entry],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    let (outputs, summary) = executor
        .execute_items(
            support::items(vec![json!(0), json!(1), json!(2), json!(3)]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.entered, 4);
    assert_eq!(summary.emitted, 2);
    assert_eq!(summary.dropped, 2);
    assert_eq!(summary.entered, summary.emitted + summary.dropped);
    assert_eq!(outputs.len(), 2);
}

#[tokio::test]
async fn test_manual_config_overrides_pipeline_defaults() {
    // Pipeline defaults would allow 10 retries; the manual config caps at
    // 2 total invocations.
    let broken = AlwaysFailsStep::new();
    let entry = unary_entry("broken", 1, broken.clone(), "Doc", "Doc")
        .with_config(manual_config(1, true));

    let defaults = support::fast_defaults();
    assert_eq!(defaults.retry_limit, 10);

    let (executor, _) = support::assemble(
        vec![entry],
        Vec::new(),
        &ObserverRegistry::new(),
        &defaults,
    );

    executor
        .execute_items(support::items(vec![json!("x")]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(broken.calls(), 2);
}

#[tokio::test]
async fn test_defaults_recovery_applies_without_manual_config() {
    let broken = AlwaysFailsStep::new();
    let entry = unary_entry("broken", 1, broken.clone(), "Doc", "Doc");

    let mut defaults = support::fast_defaults();
    defaults.retry_limit = 1;
    defaults.recover_on_failure = true;

    let (executor, _) = support::assemble(
        vec![entry],
        Vec::new(),
        &ObserverRegistry::new(),
        &defaults,
    );

    let (outputs, summary) = executor
        .execute_items(support::items(vec![json!("y")]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(broken.calls(), 2);
    assert_eq!(outputs[0].payload(), &json!("y"));
    assert_eq!(summary.recovered, 1);
}

#[tokio::test]
async fn test_failure_after_dead_letter_reraise() {
    struct ReRaise;

    #[async_trait::async_trait]
    impl typed_pipeline_domain::UnaryUnaryService for ReRaise {
        async fn apply(
            &self,
            _item: typed_pipeline_domain::PipelineItem,
        ) -> Result<typed_pipeline_domain::PipelineItem, PipelineError> {
            Err(PipelineError::transient("broken"))
        }

        fn has_dead_letter(&self) -> bool {
            true
        }

        async fn dead_letter(
            &self,
            _item: typed_pipeline_domain::PipelineItem,
            cause: PipelineError,
        ) -> Result<Option<typed_pipeline_domain::PipelineItem>, PipelineError> {
            Err(cause)
        }
    }

    let entry = unary_entry("re-raise", 1, std::sync::Arc::new(ReRaise), "Doc", "Doc")
        .with_config(manual_config(0, true));

    let (executor, _) = support::assemble(
        vec![entry],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    // A defined dead-letter handler is final: its re-raise escalates even
    // though recover_on_failure is set.
    let err = executor
        .execute_items(support::items(vec![json!("x")]), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::PipelineFailure(_)));
}

#[tokio::test]
async fn test_expansion_step_retry_applies_to_invocation() {
    use futures::StreamExt;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyExpander {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl typed_pipeline_domain::UnaryStreamingService for FlakyExpander {
        async fn apply(
            &self,
            item: typed_pipeline_domain::PipelineItem,
        ) -> Result<typed_pipeline_domain::ItemStream, PipelineError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(PipelineError::transient("first call fails"));
            }
            Ok(futures::stream::iter([Ok(item)]).boxed())
        }
    }

    let expander = std::sync::Arc::new(FlakyExpander {
        calls: AtomicU32::new(0),
    });
    let entry = typed_pipeline::infrastructure::runtime::executor::RegisteredStep::local(
        support::step(
            "flaky-expander",
            1,
            typed_pipeline_domain::StepShape::UnaryStreaming,
        ),
        StepHandler::UnaryStreaming(expander.clone()),
    )
    .with_config(manual_config(2, false));

    let (executor, _) = support::assemble(
        vec![entry],
        Vec::new(),
        &ObserverRegistry::new(),
        &support::fast_defaults(),
    );

    let (outputs, _) = executor
        .execute_items(support::items(vec![json!(5)]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(expander.calls.load(Ordering::SeqCst), 2);
}
