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

use super::{ModuleLocator, ModuleManifest, SharedModule, SlotCapability};
use std::fmt;

/// A slot that discovery could not turn into a module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// The locator had no instance for the slot.
    #[error("Can't find game module: {slot}")]
    Unresolved {
        /// The slot's name.
        slot: &'static str,
    },
}

/// A located module together with the priority it was declared with.
#[derive(Clone)]
pub struct ResolvedModule {
    /// Declared priority; lower runs first.
    pub priority: i32,
    /// The slot's name.
    pub name: &'static str,
    /// The located instance.
    pub module: SharedModule,
}

impl fmt::Debug for ResolvedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedModule")
            .field("priority", &self.priority)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Receives discovered modules in initialization order.
pub trait ModuleHost {
    /// Registers one module.
    fn add_module(&mut self, module: ResolvedModule);
}

impl ModuleHost for Vec<ResolvedModule> {
    fn add_module(&mut self, module: ResolvedModule) {
        self.push(module);
    }
}

/// Resolves the manifest's module slots and orders them by ascending priority.
///
/// Slots that are not modules or carry no priority are skipped silently. A
/// slot the locator cannot resolve is logged as an error and skipped. Slots
/// with equal priority keep their declaration order.
pub fn discover_modules(
    manifest: &ModuleManifest,
    locator: &dyn ModuleLocator,
) -> Vec<ResolvedModule> {
    let mut modules = Vec::with_capacity(manifest.len());

    for slot in manifest.iter() {
        if slot.capability() != SlotCapability::Module {
            continue;
        }
        let Some(priority) = slot.priority() else {
            continue;
        };

        match locator.locate(slot) {
            Some(module) => modules.push(ResolvedModule {
                priority,
                name: slot.name(),
                module,
            }),
            None => {
                log::error!("{}", DiscoveryError::Unresolved { slot: slot.name() });
            }
        }
    }

    // `sort_by_key` is stable.
    modules.sort_by_key(|m| m.priority);
    modules
}

/// Discovers the manifest's modules and registers them with `host` in order.
///
/// Returns the number of modules registered.
pub fn startup_modules(
    manifest: &ModuleManifest,
    locator: &dyn ModuleLocator,
    host: &mut dyn ModuleHost,
) -> usize {
    let modules = discover_modules(manifest, locator);
    let count = modules.len();
    for module in modules {
        log::info!(
            "Discovery: Registered {} (priority={})",
            module.name,
            module.priority
        );
        host.add_module(module);
    }
    count
}
