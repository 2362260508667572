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

//! The message bus as a bootable module.

use std::any::Any;
use std::sync::Arc;
use tgf_core::message::{HandlerTable, MessageBus};
use tgf_core::module::GameModule;

/// Owns the global handler table and installs it into the bus on init.
///
/// Stopping the module drops every handler from the bus.
pub struct MessageModule {
    bus: Arc<MessageBus>,
    handlers: HandlerTable,
}

impl MessageModule {
    /// Creates the module for `bus`, to be initialized with `handlers`.
    pub fn new(bus: Arc<MessageBus>, handlers: HandlerTable) -> Self {
        Self { bus, handlers }
    }

    /// The bus this module drives.
    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// The handler table installed on init.
    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }
}

impl GameModule for MessageModule {
    fn name(&self) -> &'static str {
        "MessageModule"
    }

    fn on_init(&mut self) -> anyhow::Result<()> {
        let installed = self.bus.initialize(&self.handlers)?;
        log::info!("MessageModule: Installed {installed} global handler(s)");
        Ok(())
    }

    fn on_stop(&mut self) {
        self.bus.clear();
        log::info!("MessageModule: Cleared all handlers");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
