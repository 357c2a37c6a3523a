// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Error Taxonomy
//!
//! This module defines the error types shared by every layer of the typed
//! pipeline framework. The taxonomy distinguishes the failure classes the
//! runtime treats differently:
//!
//! - **Assembly-time failures** (`InvalidConfiguration`,
//!   `IncompatibleShape`) are fatal to the pipeline and surface before any
//!   item is admitted.
//! - **Startup failures** (`StartupTimeout`) abort the run before input
//!   admission when a remote dependency never becomes healthy.
//! - **Per-item failures** (`TransientFailure`) feed the retry engine and
//!   may be recovered locally without terminating the stream.
//! - **Stream-terminal failures** (`PipelineFailure`) propagate downstream
//!   and end the run unless a stage recovers.
//! - **Cancellation** (`Cancelled`) is ordinary termination, not an error
//!   condition; finalisers still run.
//! - **Transport statuses** (`TransportStatus`) are the wire form of a
//!   user-step failure produced by the server adapters.
//!
//! ## Design Principles
//!
//! - **Specific**: each variant represents one failure mode
//! - **Actionable**: messages carry enough context for debugging
//! - **Categorized**: `category()` groups errors for metrics and logging
//! - **Cloneable**: errors can be recorded and re-emitted without cost

use thiserror::Error;

/// Transport-level status codes used when a step failure crosses a wire
/// boundary.
///
/// The set mirrors the subset of gRPC status codes the framework actually
/// produces; server adapters translate any user failure into `Internal`
/// while preserving the original message as the status description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    Cancelled,
    DeadlineExceeded,
    Unavailable,
    Internal,
}

impl StatusCode {
    /// Wire spelling of the status code, used as a metric label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain-specific errors for the typed pipeline framework.
///
/// Each variant includes a descriptive message designed to tell the
/// operator what went wrong and, where possible, how to fix it.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Incompatible shape: {0}")]
    IncompatibleShape(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Startup timeout: {0}")]
    StartupTimeout(String),

    #[error("Transient failure: {0}")]
    TransientFailure(String),

    #[error("Pipeline failure: {0}")]
    PipelineFailure(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Transport status {code}: {description}")]
    TransportStatus { code: StatusCode, description: String },

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl PipelineError {
    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new invalid-input (usage) error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a new startup timeout error
    pub fn startup_timeout(msg: impl Into<String>) -> Self {
        Self::StartupTimeout(msg.into())
    }

    /// Creates a new transient per-item failure (eligible for retry)
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientFailure(msg.into())
    }

    /// Creates a new terminal stream failure
    pub fn pipeline_failure(msg: impl Into<String>) -> Self {
        Self::PipelineFailure(msg.into())
    }

    /// Creates a new cancellation marker
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Creates the wire form of a user-step failure: status `INTERNAL`
    /// whose description is the original message.
    pub fn transport_internal(msg: impl Into<String>) -> Self {
        Self::TransportStatus {
            code: StatusCode::Internal,
            description: msg.into(),
        }
    }

    /// Creates a new persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceError(msg.into())
    }

    /// Creates a new metrics error
    pub fn metrics_error(msg: impl Into<String>) -> Self {
        Self::MetricsError(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks if the error represents cancellation (ordinary termination).
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PipelineError::Cancelled(_))
    }

    /// Checks if the error is recoverable by the per-item retry engine.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::TransientFailure(_) | PipelineError::IoError(_)
        )
    }

    /// Transport status code to record for this error on an RPC boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Cancelled(_) => StatusCode::Cancelled,
            PipelineError::StartupTimeout(_) => StatusCode::Unavailable,
            PipelineError::TransportStatus { code, .. } => *code,
            _ => StatusCode::Internal,
        }
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::InvalidConfiguration(_) => "configuration",
            PipelineError::IncompatibleShape(_) => "configuration",
            PipelineError::InvalidInput(_) => "usage",
            PipelineError::StartupTimeout(_) => "startup",
            PipelineError::TransientFailure(_) => "transient",
            PipelineError::PipelineFailure(_) => "pipeline",
            PipelineError::Cancelled(_) => "cancellation",
            PipelineError::TransportStatus { .. } => "transport",
            PipelineError::PersistenceError(_) => "persistence",
            PipelineError::SerializationError(_) => "serialization",
            PipelineError::IoError(_) => "io",
            PipelineError::MetricsError(_) => "metrics",
            PipelineError::InternalError(_) => "internal",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}
