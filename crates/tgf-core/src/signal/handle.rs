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

use super::SignalError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};

type Continuation = Box<dyn FnOnce() + Send>;

struct SlotState<T> {
    outcome: Option<Result<T, SignalError>>,
    continuation: Option<Continuation>,
    waker: Option<Waker>,
}

/// The shared one-shot cell behind a [`WaitHandle`] and its resolver.
pub(crate) struct Slot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState {
                outcome: None,
                continuation: None,
                waker: None,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores the outcome, then runs the continuation and wakes the waiter.
    ///
    /// Returns `false` if the slot was already resolved; the first outcome wins.
    pub(crate) fn resolve(&self, outcome: Result<T, SignalError>) -> bool {
        let (continuation, waker) = {
            let mut state = self.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome);
            (state.continuation.take(), state.waker.take())
        };

        if let Some(continuation) = continuation {
            continuation();
        }
        if let Some(waker) = waker {
            waker.wake();
        }
        true
    }
}

/// The waiting side of a completion signal.
///
/// A handle is produced by [`Monitor::wait`](super::Monitor::wait) and is
/// resolved exactly once: with a value by
/// [`Monitor::set_result`](super::Monitor::set_result), or with a
/// [`SignalError`] when the wait is cancelled or superseded.
///
/// It can be polled as a [`Future`], or driven manually with
/// [`on_completed`](Self::on_completed) and [`result`](Self::result).
pub struct WaitHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> WaitHandle<T> {
    pub(crate) fn new(slot: Arc<Slot<T>>) -> Self {
        Self { slot }
    }

    /// Returns `true` once the signal has been resolved, successfully or not.
    pub fn is_completed(&self) -> bool {
        self.slot.lock().outcome.is_some()
    }

    /// Registers the continuation run when the signal resolves.
    ///
    /// Only one continuation is kept: registering again replaces the previous
    /// one. If the signal is already resolved, `callback` runs immediately.
    pub fn on_completed<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.slot.lock();
        if state.outcome.is_some() {
            drop(state);
            callback();
        } else {
            state.continuation = Some(Box::new(callback));
        }
    }

    /// Returns the error the signal resolved with, if it failed.
    pub fn error(&self) -> Option<SignalError> {
        match &self.slot.lock().outcome {
            Some(Err(e)) => Some(*e),
            _ => None,
        }
    }
}

impl<T: Clone> WaitHandle<T> {
    /// Returns the value once the signal completed successfully.
    pub fn result(&self) -> Option<T> {
        match &self.slot.lock().outcome {
            Some(Ok(value)) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T: Clone> Future for WaitHandle<T> {
    type Output = Result<T, SignalError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut guard = self.slot.lock();
        let state = &mut *guard;
        if let Some(outcome) = &state.outcome {
            return Poll::Ready(outcome.clone());
        }
        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl<T> fmt::Debug for WaitHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitHandle")
            .field("type", &std::any::type_name::<T>())
            .field("completed", &self.is_completed())
            .finish()
    }
}
