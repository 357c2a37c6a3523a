// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Standardized Unix exit codes following BSD `sysexits.h` conventions,
//! restricted to the codes the orchestrator contract actually produces:
//!
//! - **0**: success
//! - **64** (`USAGE`): missing, malformed, or invalid input
//! - **69** (`UNAVAILABLE`): a remote dependency never became healthy
//!   within the startup deadline
//! - **70** (`SOFTWARE`): terminal pipeline failure at runtime
//! - **78** (`CONFIG`): assembly-time configuration error
//! - **130/143**: interrupted/terminated by signal
//!
//! Unlike generic error-string sniffing, the mapping here is driven by the
//! `PipelineError` taxonomy, so the exit code is stable for every failure
//! class the runtime defines.

use std::fmt;

use typed_pipeline_domain::PipelineError;

/// Exit codes following Unix conventions (BSD sysexits.h)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// General error (1)
    Error = 1,

    /// Command line usage error (64)
    /// - Missing input on every source (CLI, env, stdin, configuration)
    /// - Malformed JSON input
    /// - Conflicting input flags
    UsageError = 64,

    /// Service unavailable (69)
    /// - Remote client step not healthy within the startup deadline
    Unavailable = 69,

    /// Internal software error (70)
    /// - Terminal pipeline failure surfaced to the orchestrator
    Software = 70,

    /// Configuration error (78)
    /// - Aspect expansion failure, shape/type mismatch, missing mapper
    Config = 78,

    /// Interrupted by signal (SIGINT - Ctrl+C) (130)
    Interrupted = 130,

    /// Terminated by signal (SIGTERM) (143)
    Terminated = 143,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a pipeline error to its contractual exit code.
    pub fn from_pipeline_error(error: &PipelineError) -> Self {
        match error {
            PipelineError::InvalidInput(_) => ExitCode::UsageError,
            PipelineError::InvalidConfiguration(_) | PipelineError::IncompatibleShape(_) => {
                ExitCode::Config
            }
            PipelineError::StartupTimeout(_) => ExitCode::Unavailable,
            PipelineError::Cancelled(_) => ExitCode::Interrupted,
            PipelineError::PipelineFailure(_)
            | PipelineError::TransientFailure(_)
            | PipelineError::TransportStatus { .. }
            | PipelineError::PersistenceError(_)
            | PipelineError::SerializationError(_)
            | PipelineError::MetricsError(_)
            | PipelineError::InternalError(_) => ExitCode::Software,
            PipelineError::IoError(_) => ExitCode::Error,
        }
    }

    /// Maps an orchestration result to a process exit code.
    pub fn from_result<T>(result: &Result<T, PipelineError>) -> Self {
        match result {
            Ok(_) => ExitCode::Success,
            Err(e) => Self::from_pipeline_error(e),
        }
    }

    /// Get human-readable description of exit code
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::Error => "General error",
            ExitCode::UsageError => "Command line usage error",
            ExitCode::Unavailable => "Service unavailable",
            ExitCode::Software => "Internal software error",
            ExitCode::Config => "Configuration error",
            ExitCode::Interrupted => "Interrupted by signal (SIGINT)",
            ExitCode::Terminated => "Terminated by signal (SIGTERM)",
        }
    }

    /// Check if this is a success exit code
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}
