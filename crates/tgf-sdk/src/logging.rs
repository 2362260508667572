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

//! Installs the `env_logger` backend for the `log` facade.

use env_logger::{Builder, Env};
use log::LevelFilter;
use tgf_core::config::LoggingConfig;

/// Installs a global logger configured from `config`.
///
/// `RUST_LOG` takes precedence over `config.level`. Per-module filters with an
/// unknown level name are ignored with a warning. Returns `false` if a logger
/// was already installed, in which case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let mut builder = Builder::from_env(Env::default().default_filter_or(config.level.as_str()));

    let mut rejected = Vec::new();
    for filter in &config.filters {
        match filter.level.parse::<LevelFilter>() {
            Ok(level) => {
                builder.filter_module(&filter.module, level);
            }
            Err(_) => rejected.push(filter),
        }
    }

    if builder.try_init().is_err() {
        return false;
    }

    for filter in rejected {
        log::warn!(
            "Logging: Ignoring filter for {} with unknown level '{}'",
            filter.module,
            filter.level
        );
    }
    true
}
