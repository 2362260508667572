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

use super::{GameModule, ModuleSlot, SharedModule};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Finds the instance that fills a declared slot.
pub trait ModuleLocator {
    /// Returns the instance for `slot`, or `None` if nothing provides it.
    fn locate(&self, slot: &ModuleSlot) -> Option<SharedModule>;
}

impl<F> ModuleLocator for F
where
    F: Fn(&ModuleSlot) -> Option<SharedModule>,
{
    fn locate(&self, slot: &ModuleSlot) -> Option<SharedModule> {
        self(slot)
    }
}

/// The components attached to a composition root, keyed by [`TypeId`].
///
/// At most one instance per concrete type is held. Slots resolve against it
/// by their declared type.
///
/// # Example
///
/// ```rust
/// use std::any::Any;
/// use tgf_core::module::{ComponentGraph, GameModule, ModuleLocator, ModuleSlot};
///
/// struct Physics { gravity: f32 }
///
/// impl GameModule for Physics {
///     fn as_any(&self) -> &dyn Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// }
///
/// let mut graph = ComponentGraph::new();
/// let physics = graph.insert(Physics { gravity: -9.8 });
///
/// assert!(graph.locate(&ModuleSlot::module::<Physics>(0)).is_some());
/// assert_eq!(physics.lock().unwrap().gravity, -9.8);
/// ```
#[derive(Default)]
pub struct ComponentGraph {
    components: HashMap<TypeId, (&'static str, SharedModule)>,
}

impl ComponentGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: HashMap::new(),
        }
    }

    /// Attaches a module, keyed by `M`'s [`TypeId`], and returns a typed handle to it.
    ///
    /// If a module of the same type was already attached, it is replaced.
    pub fn insert<M: GameModule + 'static>(&mut self, module: M) -> Arc<Mutex<M>> {
        let typed = Arc::new(Mutex::new(module));
        let shared: SharedModule = typed.clone();
        self.components
            .insert(TypeId::of::<M>(), (std::any::type_name::<M>(), shared));
        typed
    }

    /// Attaches an already shared module under an explicit type key.
    pub fn insert_shared(&mut self, type_id: TypeId, name: &'static str, module: SharedModule) {
        self.components.insert(type_id, (name, module));
    }

    /// Returns the module attached for `type_id`.
    #[must_use]
    pub fn get(&self, type_id: TypeId) -> Option<SharedModule> {
        self.components
            .get(&type_id)
            .map(|(_, module)| Arc::clone(module))
    }

    /// Returns `true` if a module of type `M` is attached.
    #[must_use]
    pub fn contains<M: 'static>(&self) -> bool {
        self.components.contains_key(&TypeId::of::<M>())
    }

    /// Returns the number of attached modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl ModuleLocator for ComponentGraph {
    fn locate(&self, slot: &ModuleSlot) -> Option<SharedModule> {
        self.get(slot.type_id())
    }
}

impl fmt::Debug for ComponentGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.components.values().map(|(name, _)| name))
            .finish()
    }
}
