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

//! # TGF Core
//!
//! The building blocks of a TGF application: bounded object pools,
//! per-type completion signals, a typed message bus, and prioritized module
//! discovery.

#![warn(missing_docs)]

pub mod config;
pub mod memory;
pub mod message;
pub mod module;
pub mod signal;

pub use async_trait::async_trait;
pub use config::FrameworkConfig;

#[doc(hidden)]
pub use inventory;
