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

//! One-shot, per-type completion signals.
//!
//! A [`Monitor`] is a rendezvous point between a waiter and a resolver that only
//! agree on a payload type: one side calls [`Monitor::wait`] and awaits the
//! returned [`WaitHandle`], the other calls [`Monitor::set_result`] with a value
//! of that type. Waits can be cancelled explicitly or through a
//! [`CancelToken`].

mod cancel;
mod handle;
mod monitor;

pub use self::cancel::{CancelKey, CancelToken};
pub use self::handle::WaitHandle;
pub use self::monitor::Monitor;

/// Why a [`WaitHandle`] resolved without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    /// The wait was cancelled before a result arrived.
    #[error("the wait was cancelled")]
    Cancelled,
    /// A newer wait for the same type replaced this one.
    #[error("a newer wait for the same type replaced this one")]
    Superseded,
}
