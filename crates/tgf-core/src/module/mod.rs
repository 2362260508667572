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

//! Game modules and their discovery.
//!
//! A composition root declares a [`ModuleManifest`] of prioritized slots.
//! [`discover_modules`] resolves each slot through a [`ModuleLocator`] and
//! returns the modules in ascending priority order, and [`startup_modules`]
//! hands them to a [`ModuleHost`].

mod discovery;
mod locator;
mod slot;

pub use self::discovery::{
    discover_modules, startup_modules, DiscoveryError, ModuleHost, ResolvedModule,
};
pub use self::locator::{ComponentGraph, ModuleLocator};
pub use self::slot::{ModuleManifest, ModuleSlot, SlotCapability};

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A module shared between the locator that owns it and the host that drives it.
pub type SharedModule = Arc<Mutex<dyn GameModule>>;

/// A unit of functionality with lifecycle hooks.
///
/// Every hook has an empty default. The host calls them in module order:
/// [`on_init`](Self::on_init) for all modules, then [`on_start`](Self::on_start),
/// then the update hooks once per frame, and [`on_stop`](Self::on_stop) in
/// reverse order on shutdown.
pub trait GameModule: Send {
    /// A human-readable name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Called once when the host initializes its modules.
    fn on_init(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once after every module has been initialized.
    fn on_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once per frame.
    fn on_update(&mut self, _dt: Duration) {}

    /// Called once per frame after every module's [`on_update`](Self::on_update).
    fn on_late_update(&mut self, _dt: Duration) {}

    /// Called zero or more times per frame at the configured fixed timestep.
    fn on_fixed_update(&mut self, _dt: Duration) {}

    /// Called once when the host shuts down.
    fn on_stop(&mut self) {}

    /// Allows downcasting to concrete module types.
    fn as_any(&self) -> &dyn Any;

    /// Allows mutable downcasting to concrete module types.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
