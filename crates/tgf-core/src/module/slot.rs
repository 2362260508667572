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

use super::GameModule;
use std::any::{type_name, TypeId};

/// Whether a slot's declared type is a [`GameModule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCapability {
    /// The declared type implements [`GameModule`].
    Module,
    /// Any other type. Discovery ignores these slots.
    Other,
}

/// A declared reference to a module: its type, priority, and capability.
///
/// Lower priorities are initialized first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSlot {
    name: &'static str,
    type_id: TypeId,
    priority: Option<i32>,
    capability: SlotCapability,
}

impl ModuleSlot {
    /// A module slot with the given priority.
    pub fn module<M: GameModule + 'static>(priority: i32) -> Self {
        Self {
            name: type_name::<M>(),
            type_id: TypeId::of::<M>(),
            priority: Some(priority),
            capability: SlotCapability::Module,
        }
    }

    /// A module slot without priority metadata. Discovery skips it.
    pub fn unprioritized<M: GameModule + 'static>() -> Self {
        Self {
            priority: None,
            ..Self::module::<M>(0)
        }
    }

    /// A slot whose type is not a module. Discovery skips it.
    pub fn other<T: 'static>(priority: Option<i32>) -> Self {
        Self {
            name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            priority,
            capability: SlotCapability::Other,
        }
    }

    /// Overrides the slot's display name.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// The slot's display name; the declared type's name unless overridden.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The declared type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The declared priority, if any.
    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    /// The declared type's capability.
    pub fn capability(&self) -> SlotCapability {
        self.capability
    }
}

/// The ordered list of module slots declared at the composition root.
///
/// Declaration order breaks priority ties.
#[derive(Debug, Clone, Default)]
pub struct ModuleManifest {
    slots: Vec<ModuleSlot>,
}

impl ModuleManifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a module slot with the given priority.
    pub fn module<M: GameModule + 'static>(self, priority: i32) -> Self {
        self.slot(ModuleSlot::module::<M>(priority))
    }

    /// Declares an arbitrary slot.
    pub fn slot(mut self, slot: ModuleSlot) -> Self {
        self.push(slot);
        self
    }

    /// Appends a slot in place.
    pub fn push(&mut self, slot: ModuleSlot) {
        self.slots.push(slot);
    }

    /// Iterates the slots in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleSlot> {
        self.slots.iter()
    }

    /// Returns the number of declared slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
