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

//! A registry of recycling pools, one per container type.
//!
//! The [`PoolRegistry`] is owned by the composition root and handed to whoever
//! needs scratch containers (the message bus uses it for dispatch snapshots).
//! Each container type `C` gets its own lazily created [`ObjectPool<C>`], so
//! two registries never share cached objects. Tests can create a fresh
//! registry to stay isolated from the rest of the application.

use super::pool::{ObjectPool, Recycle, DEFAULT_POOL_CAPACITY};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A type-map of [`ObjectPool`]s keyed by the pooled container's [`TypeId`].
pub struct PoolRegistry {
    pools: Mutex<HashMap<TypeId, Box<dyn Any + Send>>>,
    capacity: usize,
}

impl PoolRegistry {
    /// Creates an empty registry whose pools use the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Creates an empty registry whose pools retain at most `capacity` objects.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Returns the capacity given to every pool created by this registry.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Takes a recycled `C` from its pool, or a fresh one.
    pub fn obtain<C>(&self) -> C
    where
        C: Default + Recycle + Send + 'static,
    {
        self.with_pool(|pool: &mut ObjectPool<C>| pool.obtain())
    }

    /// Returns `value` to the pool for `C`.
    ///
    /// Follows [`ObjectPool::release`]: when the pool is full the value is
    /// dropped without being recycled.
    pub fn release<C>(&self, value: C)
    where
        C: Default + Recycle + Send + 'static,
    {
        self.with_pool(|pool: &mut ObjectPool<C>| pool.release(value));
    }

    /// Empties the pool for `C`, if it exists.
    pub fn clear<C>(&self)
    where
        C: Default + Recycle + Send + 'static,
    {
        let mut pools = self.lock();
        if let Some(pool) = pools
            .get_mut(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_mut::<ObjectPool<C>>())
        {
            pool.clear();
        }
    }

    /// Drops every pool and everything they cached.
    pub fn clear_all(&self) {
        self.lock().clear();
    }

    /// Returns how many `C` objects are currently cached.
    pub fn pooled<C>(&self) -> usize
    where
        C: Default + Recycle + Send + 'static,
    {
        self.lock()
            .get(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_ref::<ObjectPool<C>>())
            .map_or(0, ObjectPool::len)
    }

    /// Returns the number of container types that have a pool.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no pool has been created yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn with_pool<C, R>(&self, f: impl FnOnce(&mut ObjectPool<C>) -> R) -> R
    where
        C: Default + Recycle + Send + 'static,
    {
        let capacity = self.capacity;
        let mut pools = self.lock();
        let entry = pools.entry(TypeId::of::<C>()).or_insert_with(|| {
            log::trace!(
                "PoolRegistry: creating pool for {} (capacity={capacity})",
                std::any::type_name::<C>()
            );
            let pool: Box<dyn Any + Send> =
                Box::new(ObjectPool::<C>::recycling_with_capacity(capacity));
            pool
        });
        match entry.downcast_mut::<ObjectPool<C>>() {
            Some(pool) => f(pool),
            // The key is derived from `C`, so the stored pool always matches.
            None => unreachable!("pool registered under the wrong TypeId"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TypeId, Box<dyn Any + Send>>> {
        // Pools stay structurally valid after a panic mid-operation.
        self.pools.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
