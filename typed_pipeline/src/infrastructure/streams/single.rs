// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Single Value Primitive
//!
//! A `Single<T>` represents a computation that eventually emits exactly
//! one value or one failure. It is a thin layer over `futures` boxed
//! futures with three source flavours:
//!
//! - **ready** values and failures (`just`, `failure`)
//! - **eager** futures already in flight (`from_future`)
//! - **deferred** factories that build a fresh future per subscription
//!   (`defer`) - the only flavour that can be re-subscribed, which is what
//!   `retry` needs
//!
//! Combinators consume the `Single` and return a new one, mirroring how
//! the rest of the codebase chains stream adapters. All suspension points
//! are cancellable through [`Single::cancellable`].

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;

use typed_pipeline_bootstrap::shutdown::CancellationToken;
use typed_pipeline_domain::PipelineError;

use crate::infrastructure::runtime::retry::RetryPolicy;
use crate::infrastructure::streams::stream_ext::TerminationGuard;

type SingleFuture<T> = BoxFuture<'static, Result<T, PipelineError>>;
type SingleFactory<T> = Arc<dyn Fn() -> SingleFuture<T> + Send + Sync>;

enum Source<T> {
    Ready(Result<T, PipelineError>),
    Eager(SingleFuture<T>),
    Deferred(SingleFactory<T>),
}

/// A computation that eventually emits exactly one value or one failure.
pub struct Single<T> {
    source: Source<T>,
}

impl<T: Send + 'static> Single<T> {
    /// A single that immediately emits `value`.
    pub fn just(value: T) -> Self {
        Self {
            source: Source::Ready(Ok(value)),
        }
    }

    /// A single that immediately fails with `error`.
    pub fn failure(error: PipelineError) -> Self {
        Self {
            source: Source::Ready(Err(error)),
        }
    }

    /// Wraps an already-created future. The computation runs once; `retry`
    /// on an eager single cannot re-subscribe it.
    pub fn from_future<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
    {
        Self {
            source: Source::Eager(future.boxed()),
        }
    }

    /// Wraps a factory invoked once per subscription. Deferred singles are
    /// lazy and re-subscribable, which makes them retryable.
    pub fn defer<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
    {
        Self {
            source: Source::Deferred(Arc::new(move || factory().boxed())),
        }
    }

    fn into_future(self) -> SingleFuture<T> {
        match self.source {
            Source::Ready(result) => futures::future::ready(result).boxed(),
            Source::Eager(future) => future,
            Source::Deferred(factory) => factory(),
        }
    }

    /// Subscribes and awaits the terminal value.
    pub async fn await_value(self) -> Result<T, PipelineError> {
        self.into_future().await
    }

    /// Maps the emitted value.
    pub fn transform<U, F>(self, f: F) -> Single<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let future = self.into_future();
        Single::from_future(async move { future.await.map(f) })
    }

    /// Maps the emitted value through a fallible function.
    pub fn try_transform<U, F>(self, f: F) -> Single<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U, PipelineError> + Send + 'static,
    {
        let future = self.into_future();
        Single::from_future(async move { future.await.and_then(f) })
    }

    /// Expands the emitted value into a stream; a failure becomes the
    /// stream's terminal failure.
    pub fn flat_map_to_stream<U, S, F>(self, f: F) -> BoxStream<'static, Result<U, PipelineError>>
    where
        U: Send + 'static,
        S: Stream<Item = Result<U, PipelineError>> + Send + 'static,
        F: FnOnce(T) -> S + Send + 'static,
    {
        let future = self.into_future();
        async move {
            match future.await {
                Ok(value) => f(value).boxed(),
                Err(error) => futures::stream::iter([Err(error)]).boxed(),
            }
        }
        .flatten_stream()
        .boxed()
    }

    /// Substitutes a failure with a fallback outcome.
    pub fn recover_with<F>(self, f: F) -> Single<T>
    where
        F: FnOnce(PipelineError) -> Result<T, PipelineError> + Send + 'static,
    {
        let future = self.into_future();
        Single::from_future(async move {
            match future.await {
                Ok(value) => Ok(value),
                Err(error) => f(error),
            }
        })
    }

    /// Transforms a failure in place.
    pub fn map_failure<F>(self, f: F) -> Single<T>
    where
        F: FnOnce(PipelineError) -> PipelineError + Send + 'static,
    {
        let future = self.into_future();
        Single::from_future(async move { future.await.map_err(f) })
    }

    /// Attaches a finaliser that runs exactly once: on success, on
    /// failure, or on drop (cancellation mid-flight).
    pub fn on_termination<F>(self, hook: F) -> Single<T>
    where
        F: FnOnce() + Send + 'static,
    {
        let future = self.into_future();
        Single::from_future(async move {
            let mut guard = TerminationGuard::new(hook);
            let result = future.await;
            guard.fire();
            result
        })
    }

    /// Retries a deferred single with exponential backoff.
    ///
    /// Ready and eager sources cannot be re-subscribed; they are returned
    /// unchanged and run at most once.
    pub fn retry(self, policy: RetryPolicy, label: &str) -> Single<T> {
        let label = label.to_string();
        match self.source {
            Source::Deferred(factory) => Single::from_future(async move {
                crate::infrastructure::runtime::retry::run_with_retry(&policy, &label, || {
                    factory()
                })
                .await
            }),
            other => Single { source: other },
        }
    }

    /// Fails with `Cancelled` as soon as the token fires, dropping the
    /// underlying computation.
    pub fn cancellable(self, token: CancellationToken) -> Single<T> {
        let future = self.into_future();
        Single::from_future(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(PipelineError::cancelled("single cancelled")),
                result = future => result,
            }
        })
    }

    /// Converts into a one-element stream (or a zero-element stream with a
    /// terminal failure).
    pub fn into_stream(self) -> BoxStream<'static, Result<T, PipelineError>> {
        futures::stream::once(self.into_future()).boxed()
    }
}
