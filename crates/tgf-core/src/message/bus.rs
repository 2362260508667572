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

use super::handler::{ErasedHandler, HandlerTable, LocalHandler, MessageHandler};
use super::{BusError, HandlerFailure, Message};
use crate::config::{BusConfig, DispatchPolicy};
use crate::memory::PoolRegistry;
use crate::signal::CancelToken;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

struct GlobalEntry {
    name: &'static str,
    handler: ErasedHandler,
}

type GlobalTable = HashMap<TypeId, Vec<GlobalEntry>>;
type LocalTable = HashMap<TypeId, Box<dyn Any + Send>>;

/// A typed, in-process publish/subscribe bus.
///
/// Two handler tables are kept per payload type:
/// - **global** handlers, built once from a [`HandlerTable`] by
///   [`initialize`](MessageBus::initialize);
/// - **local** handlers, added and removed at any time with
///   [`subscribe`](MessageBus::subscribe) / [`unsubscribe`](MessageBus::unsubscribe).
///
/// [`publish`](MessageBus::publish) awaits every global handler, then every
/// local handler, one after the other in registration order. Local handlers
/// are dispatched from a snapshot taken when the publish starts, so
/// subscriptions changed by any handler, global or local, only apply to the
/// next publish. The snapshot buffer comes from the bus' [`PoolRegistry`].
pub struct MessageBus {
    config: BusConfig,
    pools: Arc<PoolRegistry>,
    initialized: AtomicBool,
    global: RwLock<Option<Arc<GlobalTable>>>,
    local: Mutex<LocalTable>,
}

impl MessageBus {
    /// Creates an uninitialized bus sharing `pools` for dispatch snapshots.
    pub fn new(config: BusConfig, pools: Arc<PoolRegistry>) -> Self {
        log::info!("MessageBus created (dispatch={:?}).", config.dispatch);
        Self {
            config,
            pools,
            initialized: AtomicBool::new(false),
            global: RwLock::new(None),
            local: Mutex::new(HashMap::new()),
        }
    }

    /// Builds every global handler in `table` and indexes it by payload type.
    ///
    /// May only succeed once per bus. A handler whose constructor fails aborts
    /// initialization and leaves the bus uninitialized.
    ///
    /// Returns the number of handlers installed.
    pub fn initialize(&self, table: &HandlerTable) -> Result<usize, BusError> {
        if self.initialized.load(Ordering::Acquire) {
            return Err(BusError::AlreadyInitialized);
        }

        let mut global = GlobalTable::new();
        for registration in table.iter() {
            let handler = registration
                .construct()
                .map_err(|source| BusError::HandlerConstruction {
                    handler: registration.handler_name(),
                    source,
                })?;
            log::debug!(
                "MessageBus: global handler {} -> {}",
                registration.payload_name(),
                registration.handler_name()
            );
            global
                .entry(registration.payload_id())
                .or_default()
                .push(GlobalEntry {
                    name: registration.handler_name(),
                    handler,
                });
        }

        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BusError::AlreadyInitialized);
        }

        let count = table.len();
        *self.global.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(global));
        log::info!("MessageBus initialized with {count} global handler(s).");
        Ok(count)
    }

    /// Returns `true` once [`initialize`](Self::initialize) has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Appends a local handler for `T`. Duplicates are kept.
    pub fn subscribe<T: Message>(&self, handler: LocalHandler<T>) {
        if self.config.log_subscriptions {
            log::debug!("MessageBus: local subscription for {}", type_name::<T>());
        }
        let mut local = self.lock_local();
        let list = local
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Vec::<LocalHandler<T>>::new()) as Box<dyn Any + Send>);
        if let Some(list) = list.downcast_mut::<Vec<LocalHandler<T>>>() {
            list.push(handler);
        }
    }

    /// Removes the first subscription identical to `handler`.
    ///
    /// Returns whether a subscription was removed.
    pub fn unsubscribe<T: Message>(&self, handler: &LocalHandler<T>) -> bool {
        let mut local = self.lock_local();
        let Some(list) = local
            .get_mut(&TypeId::of::<T>())
            .and_then(|list| list.downcast_mut::<Vec<LocalHandler<T>>>())
        else {
            return false;
        };

        match list.iter().position(|h| h.same(handler)) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    /// Delivers `msg` to every global, then every local, handler for `T`.
    pub async fn publish<T: Message>(&self, msg: T) -> Result<(), BusError> {
        self.dispatch(msg, None).await
    }

    /// Like [`publish`](Self::publish), but stops before the next handler once
    /// `token` is cancelled and returns [`BusError::Cancelled`].
    pub async fn publish_with<T: Message>(
        &self,
        msg: T,
        token: &CancelToken,
    ) -> Result<(), BusError> {
        self.dispatch(msg, Some(token)).await
    }

    /// Returns the number of global handlers for `T`.
    pub fn global_handler_count<T: Message>(&self) -> usize {
        self.global_table()
            .and_then(|table| table.get(&TypeId::of::<T>()).map(Vec::len))
            .unwrap_or(0)
    }

    /// Returns the number of local subscriptions for `T`.
    pub fn local_handler_count<T: Message>(&self) -> usize {
        self.lock_local()
            .get(&TypeId::of::<T>())
            .and_then(|list| list.downcast_ref::<Vec<LocalHandler<T>>>())
            .map_or(0, Vec::len)
    }

    /// Drops both handler tables.
    ///
    /// The bus stays marked as initialized; global handlers are not rebuilt.
    pub fn clear(&self) {
        *self.global.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.lock_local().clear();
        log::info!("MessageBus cleared.");
    }

    /// Returns the bus configuration.
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    async fn dispatch<T: Message>(
        &self,
        msg: T,
        token: Option<&CancelToken>,
    ) -> Result<(), BusError> {
        let payload = type_name::<T>();
        let snapshot = self.snapshot_local::<T>();
        let mut failures = Vec::new();

        let outcome = self
            .dispatch_all(&msg, snapshot.as_deref().unwrap_or(&[]), token, &mut failures)
            .await;
        if let Some(snapshot) = snapshot {
            self.pools.release(snapshot);
        }
        outcome?;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BusError::Aggregate { payload, failures })
        }
    }

    async fn dispatch_all<T: Message>(
        &self,
        msg: &T,
        locals: &[LocalHandler<T>],
        token: Option<&CancelToken>,
        failures: &mut Vec<HandlerFailure>,
    ) -> Result<(), BusError> {
        self.dispatch_global(msg, token, failures).await?;
        self.dispatch_local(locals, msg, token, failures).await
    }

    async fn dispatch_global<T: Message>(
        &self,
        msg: &T,
        token: Option<&CancelToken>,
        failures: &mut Vec<HandlerFailure>,
    ) -> Result<(), BusError> {
        let payload = type_name::<T>();
        let Some(table) = self.global_table() else {
            log::trace!("MessageBus: publishing {payload} without global handlers.");
            return Ok(());
        };
        let Some(entries) = table.get(&TypeId::of::<T>()) else {
            return Ok(());
        };

        for entry in entries {
            let Some(handler) = entry.handler.downcast_ref::<Arc<dyn MessageHandler<T>>>() else {
                continue;
            };
            check_cancelled(token, payload)?;
            if let Err(error) = handler.handle(msg.clone()).await {
                self.record_failure(payload, entry.name.to_string(), error, failures)?;
            }
        }
        Ok(())
    }

    async fn dispatch_local<T: Message>(
        &self,
        locals: &[LocalHandler<T>],
        msg: &T,
        token: Option<&CancelToken>,
        failures: &mut Vec<HandlerFailure>,
    ) -> Result<(), BusError> {
        let payload = type_name::<T>();
        for (index, handler) in locals.iter().enumerate() {
            check_cancelled(token, payload)?;
            if let Err(error) = handler.call(msg.clone()).await {
                self.record_failure(payload, format!("local#{index}"), error, failures)?;
            }
        }
        Ok(())
    }

    /// Copies the current local list for `T` into a pooled buffer.
    fn snapshot_local<T: Message>(&self) -> Option<Vec<LocalHandler<T>>> {
        let local = self.lock_local();
        let list = local
            .get(&TypeId::of::<T>())
            .and_then(|list| list.downcast_ref::<Vec<LocalHandler<T>>>())?;

        let mut snapshot: Vec<LocalHandler<T>> = self.pools.obtain();
        snapshot.extend(list.iter().cloned());
        Some(snapshot)
    }

    fn record_failure(
        &self,
        payload: &'static str,
        handler: String,
        error: anyhow::Error,
        failures: &mut Vec<HandlerFailure>,
    ) -> Result<(), BusError> {
        match self.config.dispatch {
            DispatchPolicy::FailFast => Err(BusError::Handler {
                payload,
                handler,
                source: error,
            }),
            DispatchPolicy::Isolate => {
                log::error!("Handler {handler} failed on {payload}: {error:#}");
                failures.push(HandlerFailure { handler, error });
                Ok(())
            }
        }
    }

    fn global_table(&self) -> Option<Arc<GlobalTable>> {
        self.global
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock_local(&self) -> MutexGuard<'_, LocalTable> {
        self.local.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(BusConfig::default(), Arc::new(PoolRegistry::new()))
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

fn check_cancelled(token: Option<&CancelToken>, payload: &'static str) -> Result<(), BusError> {
    match token {
        Some(token) if token.is_cancelled() => Err(BusError::Cancelled { payload }),
        _ => Ok(()),
    }
}
