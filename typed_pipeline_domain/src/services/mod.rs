// /////////////////////////////////////////////////////////////////////////////
// Typed Pipeline Framework RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Service ports for the typed pipeline framework.
//!
//! The domain defines the interfaces; the runtime crate provides the
//! implementations (dependency inversion). Ports describing I/O-bound
//! collaborators (steps, persistence, remote transports) are async traits.

pub mod observer;
pub mod persistence;
pub mod remote_transport;
pub mod step_service;

pub use observer::{CacheKeyGenerator, SideEffectObserver};
pub use persistence::{PersistenceManager, PersistenceSession};
pub use remote_transport::{RemoteTransport, TransportFactory, TransportOptions};
pub use step_service::{
    ItemStream, StepHandler, StreamingStreamingService, StreamingUnaryService,
    UnaryStreamingService, UnaryUnaryService,
};
