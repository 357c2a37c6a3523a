// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Boundary adapters: wire/domain mappers, server adapters wrapping user
//! business functions, and typed client steps fronting remote endpoints.

pub mod client_step;
pub mod mapper;
pub mod server_adapter;

pub use client_step::{
    StreamingStreamingClientStep, StreamingUnaryClientStep, UnaryStreamingClientStep,
    UnaryUnaryClientStep,
};
pub use mapper::{ItemMapper, MapperRegistry};
pub use server_adapter::{
    StreamingStreamingServerAdapter, StreamingUnaryServerAdapter, UnaryStreamingServerAdapter,
    UnaryUnaryServerAdapter,
};
