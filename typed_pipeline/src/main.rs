// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Orchestrator Binary
//!
//! Composition root for the `typed_pipeline` orchestrator: parses the
//! CLI, loads defaults and the pipeline topology document, wires the
//! registry, observers, metrics, and shutdown handling, then drives one
//! run through the executor and maps the outcome to a process exit code.

use std::path::PathBuf;
use std::sync::Arc;

use typed_pipeline_bootstrap::shutdown::ShutdownCoordinator;
use typed_pipeline_bootstrap::{logger, ExitCode, ValidatedCli};
use typed_pipeline_domain::PipelineError;

use typed_pipeline::application::orchestrator::{InputSources, Orchestrator, RunOutput};
use typed_pipeline::infrastructure::aspects::expansion::ObserverRegistry;
use typed_pipeline::infrastructure::config::defaults::PipelineDefaults;
use typed_pipeline::infrastructure::config::pipeline_spec::PipelineSpec;
use typed_pipeline::infrastructure::metrics::flush::TelemetryFlusher;
use typed_pipeline::infrastructure::metrics::service::RpcMetricsService;
use typed_pipeline::infrastructure::runtime::executor::{
    PipelineExecutor, RegisteredStep, StepRegistry,
};
use typed_pipeline::infrastructure::services::cache_key::{self, CacheKeyObserver};
use typed_pipeline::infrastructure::services::debug_observer::{self, DebugObserver};
use typed_pipeline::infrastructure::services::passthrough::default_handler_for;

/// Pipeline document used when no `--pipeline` flag is given.
const DEFAULT_PIPELINE_DOCUMENT: &str = "pipeline.yaml";

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match typed_pipeline_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::UsageError.into();
        }
    };

    logger::init_logging(cli.debug);

    let result = run(cli).await;
    let exit_code = ExitCode::from_result(&result);
    match result {
        Ok(output) => {
            println!("{}", output.document);
            tracing::info!(summary = %output.summary, "orchestration finished");
        }
        Err(error) => {
            tracing::error!(error = %error, category = error.category(), "orchestration failed");
            eprintln!("{error}");
        }
    }
    exit_code.into()
}

async fn run(cli: ValidatedCli) -> Result<RunOutput, PipelineError> {
    let mut defaults = PipelineDefaults::load(cli.config.as_deref())?;
    if cli.debug {
        defaults.debug = true;
    }

    let pipeline_path = cli
        .pipeline
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PIPELINE_DOCUMENT));
    let spec = PipelineSpec::load(&pipeline_path)?;

    let metrics = Arc::new(RpcMetricsService::new()?);
    let flusher = Arc::new(TelemetryFlusher::new(metrics.clone()));

    let mut observers = ObserverRegistry::new();
    observers.register(debug_observer::PLUGIN_CLASS, Arc::new(DebugObserver::new()));
    observers.register(
        cache_key::PLUGIN_CLASS,
        Arc::new(CacheKeyObserver::default()),
    );

    // Declared steps run with shape-correct placeholder handlers until an
    // embedding application registers real implementations.
    let mut registry = StepRegistry::new();
    for (step, model) in spec.lower_steps(&defaults)? {
        let handler = default_handler_for(step.shape());
        registry.register(RegisteredStep::local(step, handler).with_model(model));
    }

    let executor = PipelineExecutor::assemble(
        registry,
        spec.lower_aspects()?,
        &observers,
        &defaults,
        metrics,
        flusher.clone(),
    )?;

    let coordinator = ShutdownCoordinator::default();
    coordinator.listen_for_signals();

    let sources = InputSources::from_process(
        cli.input.clone(),
        cli.input_list.clone(),
        defaults.input.clone(),
    );

    let orchestrator = Orchestrator::new(executor, flusher);
    let outcome = orchestrator.run(sources, coordinator.token()).await;

    if coordinator.is_shutting_down() {
        coordinator.complete_shutdown();
    }
    outcome
}
