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

//! The public-facing SDK for TGF applications.
//!
//! [`Framework`] is the composition root: it owns the object pools, the
//! message bus and the completion signal registry, discovers the declared
//! modules, and drives their lifecycle hooks.

mod framework;
pub mod logging;
mod message_module;

pub use framework::{
    Framework, FrameworkBuilder, FrameworkContext, DEFAULT_MESSAGE_PRIORITY,
    MAX_FIXED_STEPS_PER_FRAME,
};
pub use message_module::MessageModule;
pub use tgf_core;

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::logging::init_logging;
    pub use crate::{Framework, FrameworkBuilder, FrameworkContext, MessageModule};
    pub use tgf_core::async_trait;
    pub use tgf_core::config::{DispatchPolicy, FrameworkConfig};
    pub use tgf_core::memory::{ListPool, MapPool, ObjectPool, PoolRegistry, QueuePool, SetPool};
    pub use tgf_core::message::{
        BusError, HandlerRegistration, LocalHandler, MessageBus, MessageHandler,
    };
    pub use tgf_core::module::{GameModule, ModuleSlot};
    pub use tgf_core::register_handler;
    pub use tgf_core::signal::{CancelKey, CancelToken, Monitor, SignalError, WaitHandle};
}
