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

//! The composition root and its application loop.

use crate::message_module::MessageModule;
use anyhow::{anyhow, Context, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tgf_core::config::FrameworkConfig;
use tgf_core::memory::PoolRegistry;
use tgf_core::message::{HandlerRegistration, HandlerTable, Message, MessageBus, MessageHandler};
use tgf_core::module::{
    startup_modules, ComponentGraph, GameModule, ModuleHost, ModuleManifest, ModuleSlot,
    ResolvedModule,
};
use tgf_core::signal::Monitor;

/// Priority of the built-in [`MessageModule`] unless overridden.
pub const DEFAULT_MESSAGE_PRIORITY: i32 = 0;

/// Upper bound on fixed-update steps run by a single [`Framework::update`].
pub const MAX_FIXED_STEPS_PER_FRAME: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Initialized,
    Started,
    Stopped,
}

/// The shared services handed to deferred handler constructors.
///
/// The bus is held weakly: a global handler lives inside the bus, so a strong
/// reference would keep the bus alive forever.
#[derive(Clone)]
pub struct FrameworkContext {
    message: Weak<MessageBus>,
    monitor: Arc<Monitor>,
    pools: Arc<PoolRegistry>,
}

impl FrameworkContext {
    /// The message bus, or `None` once the framework is gone.
    pub fn message(&self) -> Option<Arc<MessageBus>> {
        self.message.upgrade()
    }

    /// The completion signal registry.
    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// The shared container pools.
    pub fn pools(&self) -> &Arc<PoolRegistry> {
        &self.pools
    }
}

type DeferredRegistration = Box<dyn FnOnce(&FrameworkContext) -> HandlerRegistration>;

enum PendingHandler {
    Ready(HandlerRegistration),
    Deferred(DeferredRegistration),
}

/// Collects modules, components, and handlers before building a [`Framework`].
///
/// Global handlers keep the order they were added in, whichever method added
/// them.
pub struct FrameworkBuilder {
    config: FrameworkConfig,
    slots: Vec<ModuleSlot>,
    graph: ComponentGraph,
    typed: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    handlers: Vec<PendingHandler>,
    message_priority: i32,
}

impl FrameworkBuilder {
    fn new() -> Self {
        Self {
            config: FrameworkConfig::default(),
            slots: Vec::new(),
            graph: ComponentGraph::new(),
            typed: HashMap::new(),
            handlers: Vec::new(),
            message_priority: DEFAULT_MESSAGE_PRIORITY,
        }
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: FrameworkConfig) -> Self {
        self.config = config;
        self
    }

    /// Declares a module slot with `priority` and attaches `instance` to fill it.
    pub fn module<M: GameModule + 'static>(self, priority: i32, instance: M) -> Self {
        self.declare(ModuleSlot::module::<M>(priority))
            .component(instance)
    }

    /// Declares a slot without attaching anything for it.
    pub fn declare(mut self, slot: ModuleSlot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Attaches a component without declaring a slot for it.
    ///
    /// It only becomes a module if a declared slot resolves to it.
    pub fn component<M: GameModule + 'static>(mut self, instance: M) -> Self {
        let typed = self.graph.insert(instance);
        self.typed.insert(TypeId::of::<M>(), typed);
        self
    }

    /// Adds one global handler registration.
    pub fn handler(mut self, registration: HandlerRegistration) -> Self {
        self.handlers.push(PendingHandler::Ready(registration));
        self
    }

    /// Adds a global handler built from the framework's shared services.
    ///
    /// `construct` runs when the bus is initialized. An error aborts
    /// initialization.
    pub fn handler_with<T, H, F>(mut self, construct: F) -> Self
    where
        T: Message,
        H: MessageHandler<T> + 'static,
        F: Fn(&FrameworkContext) -> Result<H> + Send + Sync + 'static,
    {
        self.handlers
            .push(PendingHandler::Deferred(Box::new(move |context: &FrameworkContext| {
                let context = context.clone();
                HandlerRegistration::from_fn::<T, H, _>(move || construct(&context))
            })));
        self
    }

    /// Adds every handler submitted with
    /// [`register_handler!`](tgf_core::register_handler).
    pub fn discover_handlers(mut self) -> Self {
        let discovered = HandlerTable::discovered();
        self.handlers
            .extend(discovered.iter().cloned().map(PendingHandler::Ready));
        self
    }

    /// Sets the priority of the built-in [`MessageModule`].
    pub fn message_priority(mut self, priority: i32) -> Self {
        self.message_priority = priority;
        self
    }

    /// Creates the shared services and registers the discovered modules in
    /// priority order.
    pub fn build(self) -> Framework {
        let Self {
            config,
            slots,
            mut graph,
            mut typed,
            handlers,
            message_priority,
        } = self;

        let pools = Arc::new(PoolRegistry::with_capacity(config.pool.capacity));
        let message = Arc::new(MessageBus::new(config.bus.clone(), Arc::clone(&pools)));
        let monitor = Arc::new(Monitor::new());

        let context = FrameworkContext {
            message: Arc::downgrade(&message),
            monitor: Arc::clone(&monitor),
            pools: Arc::clone(&pools),
        };
        let mut table = HandlerTable::new();
        for pending in handlers {
            table.register(match pending {
                PendingHandler::Ready(registration) => registration,
                PendingHandler::Deferred(build) => build(&context),
            });
        }

        let message_module = graph.insert(MessageModule::new(Arc::clone(&message), table));
        typed.insert(TypeId::of::<MessageModule>(), message_module);

        let mut manifest = ModuleManifest::new().module::<MessageModule>(message_priority);
        for slot in slots {
            manifest.push(slot);
        }

        let mut framework = Framework {
            config,
            pools,
            message,
            monitor,
            modules: Vec::new(),
            components: typed,
            lifecycle: Lifecycle::Created,
            fixed_accumulator: Duration::ZERO,
        };
        let count = startup_modules(&manifest, &graph, &mut framework);
        log::info!("Framework: {count} module(s) registered");
        framework
    }
}

/// Owns the shared services and drives module lifecycle hooks.
///
/// The loop is explicit: call [`init_modules`](Self::init_modules) and
/// [`start_modules`](Self::start_modules) once, [`update`](Self::update) once
/// per frame, and [`shutdown`](Self::shutdown) at the end. Dropping a running
/// framework shuts it down.
pub struct Framework {
    config: FrameworkConfig,
    pools: Arc<PoolRegistry>,
    message: Arc<MessageBus>,
    monitor: Arc<Monitor>,
    modules: Vec<ResolvedModule>,
    components: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    lifecycle: Lifecycle,
    fixed_accumulator: Duration,
}

impl Framework {
    /// Starts building a framework.
    pub fn builder() -> FrameworkBuilder {
        FrameworkBuilder::new()
    }

    /// Calls `on_init` on every module in priority order.
    ///
    /// The first hook error aborts initialization.
    pub fn init_modules(&mut self) -> Result<()> {
        if self.lifecycle != Lifecycle::Created {
            return Err(anyhow!("modules were already initialized"));
        }
        for entry in &self.modules {
            if let Err(e) = lock(entry).on_init() {
                log::error!("FATAL: module {} failed to initialize: {e:#}", entry.name);
                return Err(e.context(format!("initializing module {}", entry.name)));
            }
        }
        self.lifecycle = Lifecycle::Initialized;
        log::info!("Framework: {} module(s) initialized", self.modules.len());
        Ok(())
    }

    /// Calls `on_start` on every module in priority order.
    pub fn start_modules(&mut self) -> Result<()> {
        if self.lifecycle != Lifecycle::Initialized {
            return Err(anyhow!("modules must be initialized before they are started"));
        }
        for entry in &self.modules {
            lock(entry)
                .on_start()
                .with_context(|| format!("starting module {}", entry.name))?;
        }
        self.lifecycle = Lifecycle::Started;
        log::info!("Framework: started");
        Ok(())
    }

    /// Advances one frame of `dt`.
    ///
    /// Runs the fixed-update steps that fit in the accumulated time, then
    /// `on_update`, then `on_late_update`. Does nothing unless started.
    pub fn update(&mut self, dt: Duration) {
        if self.lifecycle != Lifecycle::Started {
            return;
        }

        let step = self.fixed_timestep();
        if !step.is_zero() {
            self.fixed_accumulator += dt;
            let mut steps = 0;
            while self.fixed_accumulator >= step {
                if steps == MAX_FIXED_STEPS_PER_FRAME {
                    log::debug!(
                        "Framework: dropping {:?} of fixed-update backlog",
                        self.fixed_accumulator
                    );
                    self.fixed_accumulator = Duration::ZERO;
                    break;
                }
                for entry in &self.modules {
                    lock(entry).on_fixed_update(step);
                }
                self.fixed_accumulator -= step;
                steps += 1;
            }
        }

        for entry in &self.modules {
            lock(entry).on_update(dt);
        }
        for entry in &self.modules {
            lock(entry).on_late_update(dt);
        }
    }

    /// Calls `on_stop` on every module in reverse priority order.
    ///
    /// Only the first call after initialization has an effect.
    pub fn shutdown(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Created | Lifecycle::Stopped) {
            return;
        }
        log::info!("Framework: shutting down...");
        for entry in self.modules.iter().rev() {
            lock(entry).on_stop();
        }
        self.lifecycle = Lifecycle::Stopped;
        log::info!("Framework: shutdown complete");
    }

    /// Initializes, starts, and runs `frames` frames paced by `frame_time`,
    /// then shuts down.
    ///
    /// The pacing is asynchronous, so spawned tasks and handlers make progress
    /// between frames.
    pub async fn run(&mut self, frames: u64, frame_time: Duration) -> Result<()> {
        self.init_modules()?;
        self.start_modules()?;

        let mut ticker = tokio::time::interval(frame_time.max(Duration::from_millis(1)));
        ticker.tick().await;
        let mut last = tokio::time::Instant::now();
        for _ in 0..frames {
            ticker.tick().await;
            let now = tokio::time::Instant::now();
            self.update(now - last);
            last = now;
        }

        self.shutdown();
        Ok(())
    }

    /// The message bus.
    pub fn message(&self) -> &Arc<MessageBus> {
        &self.message
    }

    /// The completion signal registry.
    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// The shared container pools.
    pub fn pools(&self) -> &Arc<PoolRegistry> {
        &self.pools
    }

    /// The configuration the framework was built with.
    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// [`GameModule::name`] of each registered module, in initialization order.
    pub fn module_names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name).collect()
    }

    /// Returns the attached component of type `M`.
    pub fn module<M: GameModule + 'static>(&self) -> Option<Arc<Mutex<M>>> {
        self.components
            .get(&TypeId::of::<M>())
            .cloned()
            .and_then(|component| component.downcast::<Mutex<M>>().ok())
    }

    fn fixed_timestep(&self) -> Duration {
        Duration::from_millis(self.config.fixed_timestep_ms)
    }
}

impl ModuleHost for Framework {
    /// Registers `module` under its [`GameModule::name`].
    fn add_module(&mut self, mut module: ResolvedModule) {
        let name = lock(&module).name();
        module.name = name;
        self.modules.push(module);
    }
}

impl Drop for Framework {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(entry: &ResolvedModule) -> MutexGuard<'_, dyn GameModule + 'static> {
    entry.module.lock().unwrap_or_else(PoisonError::into_inner)
}
