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

//! Framework configuration, loadable from RON.
//!
//! Every field has a default, so a config file only needs to name what it
//! overrides:
//!
//! ```ron
//! (
//!     bus: (dispatch: Isolate),
//!     logging: (level: "debug"),
//! )
//! ```

use crate::memory::DEFAULT_POOL_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An error raised while reading or writing a [`FrameworkConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration text is not valid RON for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The configuration could not be serialized.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] ron::Error),
}

/// How the message bus reacts to a handler returning an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchPolicy {
    /// Stop at the first failing handler and return its error.
    #[default]
    FailFast,
    /// Run every handler, log each failure, and return them all together.
    Isolate,
}

/// Settings for the [`PoolRegistry`](crate::memory::PoolRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of released objects each pool keeps.
    pub capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// Settings for the [`MessageBus`](crate::message::MessageBus).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Failure handling during publish.
    pub dispatch: DispatchPolicy,
    /// Log every local subscription at debug level.
    pub log_subscriptions: bool,
}

/// A per-module log level override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFilter {
    /// Module path prefix, e.g. `tgf_core::message`.
    pub module: String,
    /// Level name understood by `log::LevelFilter`'s `FromStr`.
    pub level: String,
}

/// Settings for the logging backend installed by the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    pub level: String,
    /// Per-module overrides applied on top of the default.
    pub filters: Vec<ModuleFilter>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filters: Vec::new(),
        }
    }
}

/// Top-level configuration for a framework instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Object pool settings.
    pub pool: PoolConfig,
    /// Message bus settings.
    pub bus: BusConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Interval between fixed-update ticks, in milliseconds.
    pub fixed_timestep_ms: u64,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            bus: BusConfig::default(),
            logging: LoggingConfig::default(),
            fixed_timestep_ms: 20,
        }
    }
}

impl FrameworkConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Reads and parses a RON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&text)?;
        log::info!("Loaded framework configuration from {}", path.display());
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }
}
