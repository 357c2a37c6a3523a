// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stream Adapters
//!
//! Extension methods over `futures::Stream` for the framework's stream
//! convention: elements are `Result<T, PipelineError>` and an `Err`
//! element is the stream's terminal failure. Adapters are written as
//! `async-stream` generators rather than hand-rolled `poll_next` state
//! machines.

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use typed_pipeline_domain::PipelineError;
use typed_pipeline_bootstrap::shutdown::CancellationToken;

/// Runs a closure exactly once, either explicitly via [`fire`] or on drop.
///
/// This is what backs the guaranteed-once `on_termination` hooks: when a
/// consumer drops a stream mid-flight (cancellation), the generator future
/// is dropped and the guard still fires.
///
/// [`fire`]: TerminationGuard::fire
pub struct TerminationGuard<F: FnOnce() + Send> {
    hook: Option<F>,
}

impl<F: FnOnce() + Send> TerminationGuard<F> {
    pub fn new(hook: F) -> Self {
        Self { hook: Some(hook) }
    }

    /// Fires the hook now if it has not fired yet.
    pub fn fire(&mut self) {
        if let Some(hook) = self.hook.take() {
            hook();
        }
    }
}

impl<F: FnOnce() + Send> Drop for TerminationGuard<F> {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Adapters over `Result`-element streams.
pub trait PipelineStreamExt<T>: Stream<Item = Result<T, PipelineError>> + Send + Sized + 'static
where
    T: Send + 'static,
{
    /// Boxes the stream into the framework's stream type.
    fn boxed_items(self) -> BoxStream<'static, Result<T, PipelineError>> {
        self.boxed()
    }

    /// Attaches a finaliser that runs exactly once: on completion, on
    /// terminal failure, or on drop (cancellation).
    fn on_termination<F>(self, hook: F) -> BoxStream<'static, Result<T, PipelineError>>
    where
        F: FnOnce() + Send + 'static,
    {
        Box::pin(async_stream::stream! {
            let mut guard = TerminationGuard::new(hook);
            let mut source = std::pin::pin!(self);
            while let Some(item) = source.next().await {
                let terminal = item.is_err();
                yield item;
                if terminal {
                    break;
                }
            }
            guard.fire();
        })
    }

    /// Substitutes a terminal failure with a recovery element and
    /// completes. Successful elements pass through untouched.
    fn recover_with<F>(self, mut recover: F) -> BoxStream<'static, Result<T, PipelineError>>
    where
        F: FnMut(PipelineError) -> Result<T, PipelineError> + Send + 'static,
    {
        Box::pin(async_stream::stream! {
            let mut source = std::pin::pin!(self);
            while let Some(item) = source.next().await {
                match item {
                    Ok(value) => yield Ok(value),
                    Err(error) => {
                        yield recover(error);
                        break;
                    }
                }
            }
        })
    }

    /// Transforms a terminal failure in place; successful elements pass
    /// through untouched.
    fn map_failure<F>(self, mut transform: F) -> BoxStream<'static, Result<T, PipelineError>>
    where
        F: FnMut(PipelineError) -> PipelineError + Send + 'static,
    {
        Box::pin(async_stream::stream! {
            let mut source = std::pin::pin!(self);
            while let Some(item) = source.next().await {
                match item {
                    Ok(value) => yield Ok(value),
                    Err(error) => {
                        yield Err(transform(error));
                        break;
                    }
                }
            }
        })
    }

    /// Terminates the stream with `Cancelled` as soon as the token fires.
    ///
    /// The upstream is dropped at that point, which propagates
    /// cancellation to producers and releases their resources.
    fn halt_on_cancel(
        self,
        token: CancellationToken,
    ) -> BoxStream<'static, Result<T, PipelineError>> {
        Box::pin(async_stream::stream! {
            let mut source = std::pin::pin!(self);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        yield Err(PipelineError::cancelled("pipeline run cancelled"));
                        break;
                    }
                    next = source.next() => match next {
                        Some(item) => {
                            let terminal = item.is_err();
                            yield item;
                            if terminal {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        })
    }
}

impl<S, T> PipelineStreamExt<T> for S
where
    S: Stream<Item = Result<T, PipelineError>> + Send + Sized + 'static,
    T: Send + 'static,
{
}
