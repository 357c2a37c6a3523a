// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Orchestrator CLI
//!
//! Argument parsing for the `typed_pipeline` orchestrator binary. The CLI
//! accepts the run input either as a single JSON document (`-i/--input`)
//! or as a JSON array (`--input-list`); the orchestrator falls back to the
//! `PIPELINE_INPUT`/`PIPELINE_INPUT_LIST` environment variables, stdin,
//! and finally a configured property when neither flag is present.
//!
//! Validation here is shape-level only (mutually exclusive flags, input
//! size cap); JSON parsing happens in the orchestrator, which owns the
//! usage-error semantics for malformed documents.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Maximum accepted length of an inline input document, in bytes.
///
/// Inline arguments are for operator convenience; anything larger should
/// arrive via stdin.
const MAX_INLINE_INPUT_BYTES: usize = 8 * 1024 * 1024;

/// Errors produced by CLI parsing and validation.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid arguments: {0}")]
    Validation(String),

    #[error(transparent)]
    Clap(#[from] clap::Error),
}

/// Raw clap surface of the orchestrator.
#[derive(Parser, Debug)]
#[command(
    name = "typed_pipeline",
    version,
    about = "Reactive multi-stage streaming pipeline runtime",
    long_about = None
)]
pub struct Cli {
    /// JSON object to feed the pipeline as a single (unary) input.
    #[arg(short = 'i', long = "input", value_name = "JSON")]
    pub input: Option<String>,

    /// JSON array of objects to feed the pipeline as a stream input.
    #[arg(long = "input-list", value_name = "JSON_ARRAY")]
    pub input_list: Option<String>,

    /// Pipeline topology document (YAML).
    #[arg(long = "pipeline", value_name = "FILE")]
    pub pipeline: Option<PathBuf>,

    /// Pipeline-wide defaults file (TOML).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

/// CLI arguments after validation.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub input: Option<String>,
    pub input_list: Option<String>,
    pub pipeline: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub debug: bool,
}

/// Parses the process arguments and applies validation rules.
///
/// Clap handles `--help` and `--version` itself and exits the process.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate(Cli::parse())
}

/// Applies the orchestrator's validation rules to parsed arguments.
pub fn validate(cli: Cli) -> Result<ValidatedCli, ParseError> {
    if cli.input.is_some() && cli.input_list.is_some() {
        return Err(ParseError::Validation(
            "--input and --input-list are mutually exclusive".to_string(),
        ));
    }

    for (flag, value) in [("--input", &cli.input), ("--input-list", &cli.input_list)] {
        if let Some(raw) = value {
            if raw.trim().is_empty() {
                return Err(ParseError::Validation(format!("{flag} must not be empty")));
            }
            if raw.len() > MAX_INLINE_INPUT_BYTES {
                return Err(ParseError::Validation(format!(
                    "{flag} exceeds the {} byte inline limit; pipe the document via stdin instead",
                    MAX_INLINE_INPUT_BYTES
                )));
            }
        }
    }

    Ok(ValidatedCli {
        input: cli.input,
        input_list: cli.input_list,
        pipeline: cli.pipeline,
        config: cli.config,
        debug: cli.debug,
    })
}
