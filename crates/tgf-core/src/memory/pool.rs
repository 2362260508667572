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

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

/// The number of released objects a pool keeps when no capacity is given.
pub const DEFAULT_POOL_CAPACITY: usize = 32;

type ResetHook<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// A bounded FIFO cache of reusable objects.
///
/// Objects are handed out in the order they were released, not the order in
/// which they were first created. When the cache is empty a fresh
/// `T::default()` is constructed, so [`obtain`](ObjectPool::obtain) never fails.
///
/// The pool is not synchronized; it expects a single owner. Share it behind a
/// lock (see [`PoolRegistry`](super::PoolRegistry)) if several call sites need it.
pub struct ObjectPool<T: Default> {
    cache: VecDeque<T>,
    capacity: usize,
    on_release: Option<ResetHook<T>>,
}

impl<T: Default> ObjectPool<T> {
    /// Creates an empty pool with the default capacity and no reset hook.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Creates an empty pool that retains at most `capacity` released objects.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: VecDeque::new(),
            capacity,
            on_release: None,
        }
    }

    /// Installs the hook invoked on every object accepted back into the pool.
    ///
    /// The hook is **not** invoked for objects dropped because the pool is full.
    pub fn with_reset<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Takes the oldest released object, or constructs a new one.
    pub fn obtain(&mut self) -> T {
        self.cache.pop_front().unwrap_or_default()
    }

    /// Returns an object to the pool.
    ///
    /// If the pool already holds `capacity` objects, `item` is dropped as-is.
    /// The capacity check happens before the reset hook runs, so a dropped
    /// item is never reset.
    pub fn release(&mut self, mut item: T) {
        if self.cache.len() >= self.capacity {
            return;
        }

        if let Some(hook) = &self.on_release {
            hook(&mut item);
        }
        self.cache.push_back(item);
    }

    /// Drops every cached object without running the reset hook.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Returns the number of objects currently cached.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if no object is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns the maximum number of cached objects.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity. Objects already cached beyond the new bound are kept
    /// until obtained; only subsequent releases observe the new limit.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }
}

impl<T: Default + Recycle + 'static> ObjectPool<T> {
    /// Creates a pool whose reset hook is [`Recycle::recycle`].
    pub fn recycling() -> Self {
        Self::recycling_with_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Same as [`recycling`](Self::recycling) with an explicit capacity.
    pub fn recycling_with_capacity(capacity: usize) -> Self {
        Self::with_capacity(capacity).with_reset(T::recycle)
    }
}

impl<T: Default> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("len", &self.cache.len())
            .field("capacity", &self.capacity)
            .field("has_reset_hook", &self.on_release.is_some())
            .finish()
    }
}

/// A container that can be emptied in place so its allocation can be reused.
pub trait Recycle {
    /// Clears the contents while keeping allocated storage.
    fn recycle(&mut self);
}

impl<T> Recycle for Vec<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

impl<T> Recycle for VecDeque<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

impl<T: Eq + Hash> Recycle for HashSet<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

impl<K: Eq + Hash, V> Recycle for HashMap<K, V> {
    fn recycle(&mut self) {
        self.clear();
    }
}

/// A pool of vectors, cleared on release.
pub type ListPool<T> = ObjectPool<Vec<T>>;
/// A pool of double-ended queues, cleared on release.
pub type QueuePool<T> = ObjectPool<VecDeque<T>>;
/// A pool of hash sets, cleared on release.
pub type SetPool<T> = ObjectPool<HashSet<T>>;
/// A pool of hash maps, cleared on release.
pub type MapPool<K, V> = ObjectPool<HashMap<K, V>>;
