// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Remote Transport Ports
//!
//! The seam between client steps and the wire. A generated transport stub
//! implements [`RemoteTransport`]; client steps receive one through
//! constructor injection of a [`TransportFactory`] plus a
//! [`TransportOptions`] struct, so generated code carries no framework
//! vocabulary.
//!
//! The four call methods mirror the four step shapes. `health_check` backs
//! the executor's startup readiness gate: no external input is admitted
//! until every remote client step reports healthy or the startup deadline
//! expires.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::PipelineError;
use crate::services::step_service::ItemStream;
use crate::value_objects::pipeline_item::PipelineItem;

/// Connection settings for a remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl TransportOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Wire-level stub for one remote service.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// The remote service identity, used for metrics and spans.
    fn service_name(&self) -> &str;

    /// Unary request, unary response.
    async fn call_unary(
        &self,
        method: &str,
        item: PipelineItem,
    ) -> Result<PipelineItem, PipelineError>;

    /// Unary request, server-streaming response.
    async fn call_server_streaming(
        &self,
        method: &str,
        item: PipelineItem,
    ) -> Result<ItemStream, PipelineError>;

    /// Client-streaming request, unary response.
    async fn call_client_streaming(
        &self,
        method: &str,
        items: ItemStream,
    ) -> Result<PipelineItem, PipelineError>;

    /// Bidirectional streaming.
    async fn call_bidi_streaming(
        &self,
        method: &str,
        items: ItemStream,
    ) -> Result<ItemStream, PipelineError>;

    /// Reports whether the remote endpoint is ready to serve traffic.
    async fn health_check(&self) -> Result<(), PipelineError>;
}

/// Factory for transport stubs, injected into generated clients.
pub trait TransportFactory: Send + Sync {
    /// Connects a stub for the given options.
    fn connect(
        &self,
        options: &TransportOptions,
    ) -> Result<Arc<dyn RemoteTransport>, PipelineError>;
}
