// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The typed message bus.
//!
//! Payloads are plain values identified by their Rust type. The
//! [`MessageBus`] routes a published payload to the global handlers built from
//! a [`HandlerTable`] and to the [`LocalHandler`]s subscribed at runtime.

mod bus;
mod handler;

pub use self::bus::MessageBus;
pub use self::handler::{
    HandlerFuture, HandlerRegistration, HandlerTable, LocalHandler, MessageHandler,
};

/// A value that can be published on the bus.
///
/// Implemented for every `Clone + Send + Sync + 'static` type. Each handler
/// receives its own clone of the published value.
pub trait Message: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Message for T {}

/// A handler error collected while dispatching in isolating mode.
#[derive(Debug)]
pub struct HandlerFailure {
    /// The failing handler: its type name for global handlers, `local#<n>` for
    /// the n-th local handler of the snapshot.
    pub handler: String,
    /// What the handler returned.
    pub error: anyhow::Error,
}

/// Errors produced by the [`MessageBus`].
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// [`MessageBus::initialize`] was called on an initialized bus.
    #[error("the message bus is already initialized")]
    AlreadyInitialized,
    /// A global handler could not be constructed during initialization.
    #[error("failed to construct message handler {handler}")]
    HandlerConstruction {
        /// The handler's type name.
        handler: &'static str,
        /// The constructor's error.
        #[source]
        source: anyhow::Error,
    },
    /// A handler failed and the bus is configured to fail fast.
    #[error("handler {handler} failed while handling {payload}")]
    Handler {
        /// The payload's type name.
        payload: &'static str,
        /// The failing handler.
        handler: String,
        /// The handler's error.
        #[source]
        source: anyhow::Error,
    },
    /// One or more handlers failed while the bus isolates failures.
    #[error("{} handler(s) failed while handling {payload}", .failures.len())]
    Aggregate {
        /// The payload's type name.
        payload: &'static str,
        /// Every failure, in dispatch order.
        failures: Vec<HandlerFailure>,
    },
    /// The publish was cancelled before all handlers ran.
    #[error("publishing {payload} was cancelled")]
    Cancelled {
        /// The payload's type name.
        payload: &'static str,
    },
}
