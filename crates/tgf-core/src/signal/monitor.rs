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

use super::handle::{Slot, WaitHandle};
use super::{CancelKey, CancelToken, SignalError};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Type-erased view of a registered signal.
trait PendingSignal: Send {
    fn id(&self) -> u64;
    fn type_name(&self) -> &'static str;
    fn fail(&self, error: SignalError);
    fn as_any(&self) -> &dyn Any;
}

struct Pending<T> {
    id: u64,
    slot: Arc<Slot<T>>,
    cancel: Option<(CancelToken, CancelKey)>,
}

impl<T> Drop for Pending<T> {
    fn drop(&mut self) {
        if let Some((token, key)) = self.cancel.take() {
            token.forget(key);
        }
    }
}

impl<T: Send + 'static> PendingSignal for Pending<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn fail(&self, error: SignalError) {
        self.slot.resolve(Err(error));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type PendingMap = HashMap<TypeId, Box<dyn PendingSignal>>;

/// A registry of one-shot completion signals keyed by payload type.
///
/// At most one signal is outstanding per type. A second
/// [`wait`](Monitor::wait) for a type that is still pending replaces the
/// earlier registration, and the earlier handle resolves with
/// [`SignalError::Superseded`].
///
/// Resolution is synchronous: [`set_result`](Monitor::set_result) runs the
/// handle's continuation on its own call stack before returning.
///
/// # Example
///
/// ```rust
/// use tgf_core::signal::Monitor;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Loaded(u32);
///
/// let monitor = Monitor::new();
/// let handle = monitor.wait::<Loaded>();
/// assert!(monitor.set_result(Loaded(7)));
/// assert_eq!(handle.result(), Some(Loaded(7)));
/// ```
pub struct Monitor {
    pending: Arc<Mutex<PendingMap>>,
    next_id: AtomicU64,
}

impl Monitor {
    /// Creates an empty monitor.
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new signal for `T` and returns its waiting handle.
    pub fn wait<T>(&self) -> WaitHandle<T>
    where
        T: Clone + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.register::<T>(id, None)
    }

    /// Like [`wait`](Self::wait), but the wait is cancelled and deregistered
    /// when `token` trips.
    pub fn wait_with<T>(&self, token: &CancelToken) -> WaitHandle<T>
    where
        T: Clone + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pending: Weak<Mutex<PendingMap>> = Arc::downgrade(&self.pending);
        let key = token.on_cancel(move || {
            if let Some(pending) = pending.upgrade() {
                let removed = take_if(&pending, TypeId::of::<T>(), Some(id));
                if let Some(signal) = removed {
                    log::debug!("Monitor: wait for {} cancelled.", signal.type_name());
                    signal.fail(SignalError::Cancelled);
                }
            }
        });

        let handle = self.register::<T>(id, Some((token.clone(), key)));
        // The token may have tripped before the entry existed.
        if token.is_cancelled() {
            if let Some(signal) = take_if(&self.pending, TypeId::of::<T>(), Some(id)) {
                signal.fail(SignalError::Cancelled);
            }
        }
        handle
    }

    /// Resolves the outstanding signal for `T` with `value`.
    ///
    /// Returns `false`, doing nothing else, if no signal is registered for `T`.
    pub fn set_result<T>(&self, value: T) -> bool
    where
        T: Clone + Send + 'static,
    {
        let Some(signal) = take_if(&self.pending, TypeId::of::<T>(), None) else {
            log::trace!("Monitor: no pending wait for {}.", type_name::<T>());
            return false;
        };

        match signal.as_any().downcast_ref::<Pending<T>>() {
            Some(pending) => pending.slot.resolve(Ok(value)),
            // Entries are keyed by `TypeId::of::<T>()`; this cannot mismatch.
            None => unreachable!("signal registered under the wrong TypeId"),
        }
    }

    /// Cancels the outstanding signal for `T`, if any.
    ///
    /// The handle resolves with [`SignalError::Cancelled`]. Returns whether a
    /// signal was pending.
    pub fn cancel<T: 'static>(&self) -> bool {
        match take_if(&self.pending, TypeId::of::<T>(), None) {
            Some(signal) => {
                signal.fail(SignalError::Cancelled);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if a signal for `T` is waiting to be resolved.
    pub fn pending<T: 'static>(&self) -> bool {
        lock(&self.pending).contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of outstanding signals across all types.
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    fn register<T>(&self, id: u64, cancel: Option<(CancelToken, CancelKey)>) -> WaitHandle<T>
    where
        T: Clone + Send + 'static,
    {
        let slot = Slot::new();
        let entry = Pending {
            id,
            slot: Arc::clone(&slot),
            cancel,
        };

        let replaced = lock(&self.pending).insert(TypeId::of::<T>(), Box::new(entry));
        if let Some(stale) = replaced {
            log::warn!(
                "Monitor: a wait for {} was still pending and has been superseded.",
                stale.type_name()
            );
            stale.fail(SignalError::Superseded);
        }

        WaitHandle::new(slot)
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("pending", &self.pending_count())
            .finish()
    }
}

fn lock(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

/// Removes the entry for `key`, optionally only if it carries the given id.
/// The lock is released before the caller resolves the returned signal.
fn take_if(
    pending: &Mutex<PendingMap>,
    key: TypeId,
    id: Option<u64>,
) -> Option<Box<dyn PendingSignal>> {
    let mut map = lock(pending);
    let matches = match map.get(&key) {
        Some(signal) => id.map_or(true, |id| signal.id() == id),
        None => false,
    };
    if matches {
        map.remove(&key)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Loaded {
        value: i32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Other;

    #[test]
    fn test_round_trip_and_second_set_result_is_noop() {
        let monitor = Monitor::new();
        let handle = monitor.wait::<Loaded>();
        assert!(!handle.is_completed());
        assert!(monitor.pending::<Loaded>());

        assert!(monitor.set_result(Loaded { value: 1 }));
        assert!(handle.is_completed());
        assert_eq!(handle.result(), Some(Loaded { value: 1 }));

        assert!(!monitor.set_result(Loaded { value: 2 }));
        assert_eq!(handle.result(), Some(Loaded { value: 1 }));
        assert_eq!(monitor.pending_count(), 0);
    }

    #[test]
    fn test_set_result_without_wait_is_silent() {
        let monitor = Monitor::new();
        assert!(!monitor.set_result(Other));
        assert_eq!(monitor.pending_count(), 0);
    }

    #[test]
    fn test_continuation_runs_synchronously_and_is_single_slot() {
        let monitor = Monitor::new();
        let handle = monitor.wait::<Loaded>();

        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let f = first.clone();
        handle.on_completed(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let s = second.clone();
        handle.on_completed(move || {
            s.fetch_add(1, Ordering::SeqCst);
        });

        monitor.set_result(Loaded { value: 3 });
        assert_eq!(first.load(Ordering::SeqCst), 0, "overwritten continuation");
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_completed_after_resolution_runs_immediately() {
        let monitor = Monitor::new();
        let handle = monitor.wait::<Loaded>();
        monitor.set_result(Loaded { value: 5 });

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        handle.on_completed(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_wait_supersedes_first() {
        let monitor = Monitor::new();
        let stale = monitor.wait::<Loaded>();
        let fresh = monitor.wait::<Loaded>();

        assert_eq!(stale.error(), Some(SignalError::Superseded));
        assert_eq!(monitor.pending_count(), 1);

        monitor.set_result(Loaded { value: 9 });
        assert_eq!(fresh.result(), Some(Loaded { value: 9 }));
        assert_eq!(stale.result(), None);
    }

    #[test]
    fn test_signals_are_per_type() {
        let monitor = Monitor::new();
        let loaded = monitor.wait::<Loaded>();
        let other = monitor.wait::<Other>();

        monitor.set_result(Other);
        assert!(other.is_completed());
        assert!(!loaded.is_completed());
        assert!(monitor.pending::<Loaded>());
    }

    #[test]
    fn test_cancel_deregisters() {
        let monitor = Monitor::new();
        let handle = monitor.wait::<Loaded>();
        assert!(monitor.cancel::<Loaded>());
        assert!(!monitor.cancel::<Loaded>());
        assert_eq!(handle.error(), Some(SignalError::Cancelled));
        assert!(!monitor.set_result(Loaded { value: 1 }));
    }

    #[test]
    fn test_token_cancels_only_its_own_wait() {
        let monitor = Monitor::new();
        let token = CancelToken::new();
        let first = monitor.wait_with::<Loaded>(&token);
        monitor.set_result(Loaded { value: 4 });

        let second = monitor.wait::<Loaded>();
        token.cancel();

        assert_eq!(first.result(), Some(Loaded { value: 4 }));
        assert!(!second.is_completed(), "a later wait is not affected");
        assert!(monitor.pending::<Loaded>());
    }

    #[test]
    fn test_resolved_waits_release_token_callbacks() {
        let monitor = Monitor::new();
        let token = CancelToken::new();

        for value in 0..100 {
            let handle = monitor.wait_with::<Loaded>(&token);
            assert!(monitor.set_result(Loaded { value }));
            assert_eq!(handle.result(), Some(Loaded { value }));
        }
        assert_eq!(token.callback_count(), 0);

        let stale = monitor.wait_with::<Loaded>(&token);
        let _fresh = monitor.wait_with::<Loaded>(&token);
        assert_eq!(stale.error(), Some(SignalError::Superseded));
        assert_eq!(token.callback_count(), 1);

        assert!(monitor.cancel::<Loaded>());
        assert_eq!(token.callback_count(), 0);
    }

    #[test]
    fn test_wait_with_tripped_token_fails_immediately() {
        let monitor = Monitor::new();
        let token = CancelToken::new();
        token.cancel();

        let handle = monitor.wait_with::<Loaded>(&token);
        assert_eq!(handle.error(), Some(SignalError::Cancelled));
        assert!(!monitor.pending::<Loaded>());
        assert_eq!(token.callback_count(), 0);
    }

    #[tokio::test]
    async fn test_await_handle() {
        let monitor = Arc::new(Monitor::new());
        let handle = monitor.wait::<Loaded>();

        let resolver = Arc::clone(&monitor);
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            resolver.set_result(Loaded { value: 42 });
        });

        assert_eq!(handle.await, Ok(Loaded { value: 42 }));
    }

    #[tokio::test]
    async fn test_await_cancelled_handle() {
        let monitor = Monitor::new();
        let token = CancelToken::new();
        let handle = monitor.wait_with::<Loaded>(&token);
        token.cancel();

        assert_eq!(handle.await, Err(SignalError::Cancelled));
        assert!(!monitor.pending::<Loaded>());
    }
}
