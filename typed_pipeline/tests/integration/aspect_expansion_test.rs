// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Aspect expansion: interleaving, synthetic identities, dedupe,
//! idempotency, and configuration failures.

use std::sync::Arc;

use typed_pipeline::infrastructure::aspects::expansion::{self, ObserverRegistry};
use typed_pipeline::infrastructure::services::passthrough::PassthroughStep;
use typed_pipeline_domain::entities::pipeline_aspect::{
    CONFIG_PLUGIN_IMPLEMENTATION_CLASS, CONFIG_TARGET_STEPS,
};
use typed_pipeline_domain::{
    AspectPosition, AspectScope, PipelineAspect, PipelineError, StepHandler,
};

use super::support::{self, aspect_config, unary_entry, TagObserver};

fn passthrough() -> Arc<PassthroughStep> {
    Arc::new(PassthroughStep::new())
}

/// Two steps typed In1 -> In2 -> Out2, as in the canonical expansion
/// example.
fn two_steps() -> Vec<typed_pipeline::infrastructure::runtime::executor::RegisteredStep> {
    vec![
        unary_entry("S1", 1, passthrough(), "In1", "In2"),
        unary_entry("S2", 2, passthrough(), "In2", "Out2"),
    ]
}

fn log_and_audit_aspects() -> Vec<PipelineAspect> {
    vec![
        PipelineAspect::new(
            "log",
            AspectScope::Global,
            AspectPosition::BeforeStep,
            1,
            aspect_config(&[(CONFIG_PLUGIN_IMPLEMENTATION_CLASS, "X")]),
        )
        .unwrap(),
        PipelineAspect::new(
            "audit",
            AspectScope::Steps,
            AspectPosition::AfterStep,
            2,
            aspect_config(&[
                (CONFIG_PLUGIN_IMPLEMENTATION_CLASS, "Y"),
                (CONFIG_TARGET_STEPS, "S2"),
            ]),
        )
        .unwrap(),
    ]
}

fn observers() -> (ObserverRegistry, Arc<TagObserver>, Arc<TagObserver>) {
    let log_observer = TagObserver::new();
    let audit_observer = TagObserver::new();
    let mut registry = ObserverRegistry::new();
    registry.register("X", log_observer.clone());
    registry.register("Y", audit_observer.clone());
    (registry, log_observer, audit_observer)
}

fn names(
    entries: &[typed_pipeline::infrastructure::runtime::executor::RegisteredStep],
) -> Vec<String> {
    entries.iter().map(|e| e.step.name().to_string()).collect()
}

#[test]
fn test_before_after_expansion_sequence() {
    let (registry, _, _) = observers();
    let expanded = expansion::expand(two_steps(), &log_and_audit_aspects(), &registry).unwrap();

    assert_eq!(
        names(&expanded),
        vec![
            "ObserveLogIn1SideEffectService",
            "S1",
            "ObserveLogIn2SideEffectService",
            "S2",
            "ObserveAuditOut2SideEffectService",
        ]
    );

    // Synthetic steps are marked side-effect and typed by the boundary
    // they observe.
    let synthetic = &expanded[0];
    assert!(synthetic.step.is_side_effect());
    let model = synthetic.model.as_ref().unwrap();
    assert_eq!(model.input().domain_type(), "In1");
    assert_eq!(model.output().domain_type(), "In1");
}

#[test]
fn test_expansion_is_idempotent() {
    let (registry, _, _) = observers();
    let aspects = log_and_audit_aspects();

    let once = expansion::expand(two_steps(), &aspects, &registry).unwrap();
    let twice = expansion::expand(once.clone(), &aspects, &registry).unwrap();

    assert_eq!(names(&once), names(&twice));
}

#[test]
fn test_shared_boundary_type_dedupes() {
    // Both steps read the same type, so the global BEFORE observer would
    // be generated twice under the same key; only the first survives.
    let entries = vec![
        unary_entry("S1", 1, passthrough(), "Doc", "Doc"),
        unary_entry("S2", 2, passthrough(), "Doc", "Doc"),
    ];
    let (registry, _, _) = observers();
    let aspects = vec![PipelineAspect::new(
        "log",
        AspectScope::Global,
        AspectPosition::BeforeStep,
        1,
        aspect_config(&[(CONFIG_PLUGIN_IMPLEMENTATION_CLASS, "X")]),
    )
    .unwrap()];

    let expanded = expansion::expand(entries, &aspects, &registry).unwrap();
    assert_eq!(
        names(&expanded),
        vec!["ObserveLogDocSideEffectService", "S1", "S2"]
    );
}

#[test]
fn test_unknown_target_step_fails() {
    let (registry, _, _) = observers();
    let aspects = vec![PipelineAspect::new(
        "audit",
        AspectScope::Steps,
        AspectPosition::AfterStep,
        1,
        aspect_config(&[
            (CONFIG_PLUGIN_IMPLEMENTATION_CLASS, "Y"),
            (CONFIG_TARGET_STEPS, "NoSuchStep"),
        ]),
    )
    .unwrap()];

    let err = expansion::expand(two_steps(), &aspects, &registry).unwrap_err();
    match err {
        PipelineError::InvalidConfiguration(message) => {
            assert!(message.contains("NoSuchStep"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_missing_plugin_class_fails() {
    let (registry, _, _) = observers();
    let aspects = vec![PipelineAspect::new(
        "log",
        AspectScope::Global,
        AspectPosition::BeforeStep,
        1,
        aspect_config(&[]),
    )
    .unwrap()];

    let err = expansion::expand(two_steps(), &aspects, &registry).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
}

#[test]
fn test_unknown_plugin_class_fails() {
    let (registry, _, _) = observers();
    let aspects = vec![PipelineAspect::new(
        "log",
        AspectScope::Global,
        AspectPosition::BeforeStep,
        1,
        aspect_config(&[(CONFIG_PLUGIN_IMPLEMENTATION_CLASS, "NotRegistered")]),
    )
    .unwrap()];

    let err = expansion::expand(two_steps(), &aspects, &registry).unwrap_err();
    match err {
        PipelineError::InvalidConfiguration(message) => {
            assert!(message.contains("NotRegistered"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_untyped_step_cannot_anchor_synthetic() {
    let entries = vec![
        typed_pipeline::infrastructure::runtime::executor::RegisteredStep::local(
            support::step("untyped", 1, typed_pipeline_domain::StepShape::UnaryUnary),
            StepHandler::UnaryUnary(passthrough()),
        ),
    ];
    let (registry, _, _) = observers();
    let aspects = vec![PipelineAspect::new(
        "log",
        AspectScope::Global,
        AspectPosition::BeforeStep,
        1,
        aspect_config(&[(CONFIG_PLUGIN_IMPLEMENTATION_CLASS, "X")]),
    )
    .unwrap()];

    let err = expansion::expand(entries, &aspects, &registry).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_observers_see_items_and_stream_is_unchanged() {
    let (registry, log_observer, audit_observer) = observers();
    let (executor, _) = support::assemble(
        two_steps(),
        log_and_audit_aspects(),
        &registry,
        &support::fast_defaults(),
    );

    let input = support::items(vec![
        serde_json::json!({"id": "a"}),
        serde_json::json!({"id": "b"}),
    ]);
    let token = typed_pipeline_bootstrap::shutdown::CancellationToken::new();
    let (outputs, summary) = executor.execute_items(input.clone(), token).await.unwrap();

    // Side-effect steps never change the value stream.
    assert_eq!(outputs, input);
    assert_eq!(summary.entered, 2);
    assert_eq!(summary.emitted, 2);

    // The global log observer fired at both boundaries for both items.
    assert_eq!(log_observer.seen().len(), 4);
    // The audit observer fired after S2 for both items.
    assert_eq!(audit_observer.seen().len(), 2);
    assert!(audit_observer
        .seen()
        .iter()
        .all(|(service, _)| service == "ObserveAuditOut2SideEffectService"));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Expansion is idempotent for arbitrary aspect names.
        #[test]
        fn expansion_idempotent_for_any_aspect_name(name in "[a-z][a-z_]{0,12}") {
            let observer = TagObserver::new();
            let mut registry = ObserverRegistry::new();
            registry.register("X", observer);

            let aspects = vec![PipelineAspect::new(
                name,
                AspectScope::Global,
                AspectPosition::BeforeStep,
                1,
                aspect_config(&[(CONFIG_PLUGIN_IMPLEMENTATION_CLASS, "X")]),
            )
            .unwrap()];

            let once = expansion::expand(two_steps(), &aspects, &registry).unwrap();
            let twice = expansion::expand(once.clone(), &aspects, &registry).unwrap();
            prop_assert_eq!(names(&once), names(&twice));
        }
    }
}
