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

use std::sync::{Arc, Mutex, MutexGuard};

type CancelCallback = Box<dyn FnOnce() + Send>;

/// Identifies a callback registered with [`CancelToken::on_cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CancelKey(u64);

#[derive(Default)]
struct CancelState {
    cancelled: bool,
    next_key: u64,
    callbacks: Vec<(CancelKey, CancelCallback)>,
}

/// A cloneable cancellation flag shared between a requester and the operations
/// it wants to abort.
///
/// Cancelling runs every callback registered through
/// [`on_cancel`](CancelToken::on_cancel) exactly once, on the cancelling
/// caller's stack. A callback that is no longer needed can be dropped with
/// [`forget`](CancelToken::forget), so a long-lived token does not accumulate
/// them.
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<Mutex<CancelState>>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the token. Subsequent calls do nothing.
    pub fn cancel(&self) {
        let callbacks = {
            let mut state = self.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            std::mem::take(&mut state.callbacks)
        };

        log::debug!("CancelToken tripped ({} callback(s)).", callbacks.len());
        for (_, callback) in callbacks {
            callback();
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Registers `callback` to run on cancellation.
    ///
    /// If the token is already cancelled, `callback` runs immediately.
    pub fn on_cancel<F>(&self, callback: F) -> CancelKey
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.lock();
        let key = CancelKey(state.next_key);
        state.next_key += 1;
        if state.cancelled {
            drop(state);
            callback();
        } else {
            state.callbacks.push((key, Box::new(callback)));
        }
        key
    }

    /// Drops the callback registered under `key` without running it.
    ///
    /// Returns `false` if it already ran or was forgotten.
    pub fn forget(&self, key: CancelKey) -> bool {
        let mut state = self.lock();
        match state.callbacks.iter().position(|(k, _)| *k == key) {
            Some(index) => {
                state.callbacks.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns the number of callbacks waiting for cancellation.
    pub fn callback_count(&self) -> usize {
        self.lock().callbacks.len()
    }

    fn lock(&self) -> MutexGuard<'_, CancelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cancel_runs_callbacks_once() {
        let token = CancelToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        token.on_cancel(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_forgotten_callback_never_runs() {
        let token = CancelToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let key = token.on_cancel(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        token.on_cancel(|| {});
        assert_eq!(token.callback_count(), 2);

        assert!(token.forget(key));
        assert!(!token.forget(key));
        assert_eq!(token.callback_count(), 1);

        token.cancel();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(token.callback_count(), 0);
    }

    #[test]
    fn test_on_cancel_after_cancel_runs_immediately() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        token.on_cancel(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
