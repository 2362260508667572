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

//! Bounded object pools used to curb allocation churn.
//!
//! [`ObjectPool`] is a FIFO cache with an optional reset hook. The
//! [`PoolRegistry`] owns one recycling pool per container type and is the way
//! the rest of the framework shares pools without hidden global state.

mod pool;
mod registry;

pub use self::pool::{
    ListPool, MapPool, ObjectPool, QueuePool, Recycle, SetPool, DEFAULT_POOL_CAPACITY,
};
pub use self::registry::PoolRegistry;
