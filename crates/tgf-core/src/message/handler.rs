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

//! Handler contracts and the registration table consumed by the bus.

use super::Message;
use async_trait::async_trait;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A global handler for payloads of type `T`.
///
/// Global handlers are instantiated once, when the bus is initialized, and
/// receive every `T` published for the lifetime of the bus.
#[async_trait]
pub trait MessageHandler<T: Message>: Send + Sync {
    /// Handles one published payload.
    async fn handle(&self, msg: T) -> anyhow::Result<()>;
}

/// A constructed global handler with its payload type erased.
///
/// Holds an `Arc<dyn MessageHandler<T>>`; the bus downcasts it back once per
/// handler list, using the `TypeId` the entry is indexed under.
pub(crate) type ErasedHandler = Arc<dyn Any + Send + Sync>;

type DynConstructor = Arc<dyn Fn() -> anyhow::Result<ErasedHandler> + Send + Sync>;

#[derive(Clone)]
enum Constructor {
    Static(fn() -> anyhow::Result<ErasedHandler>),
    Dynamic(DynConstructor),
}

/// One row of the global handler table: which payload a handler serves and how
/// to build it.
///
/// Rows are usually built with [`HandlerRegistration::of`], which requires the
/// handler to implement [`Default`]. [`register_handler!`](crate::register_handler)
/// submits such a row for link-time discovery.
#[derive(Clone)]
pub struct HandlerRegistration {
    handler_name: fn() -> &'static str,
    payload_id: fn() -> TypeId,
    payload_name: fn() -> &'static str,
    construct: Constructor,
}

inventory::collect!(HandlerRegistration);

impl HandlerRegistration {
    /// A registration that builds `H` through its [`Default`] impl.
    pub const fn of<T, H>() -> Self
    where
        T: Message,
        H: MessageHandler<T> + Default + 'static,
    {
        Self {
            handler_name: type_name::<H>,
            payload_id: TypeId::of::<T>,
            payload_name: type_name::<T>,
            construct: Constructor::Static(construct_default::<T, H>),
        }
    }

    /// A registration with a custom, possibly failing, constructor.
    ///
    /// An error returned by `construct` aborts bus initialization.
    pub fn from_fn<T, H, F>(construct: F) -> Self
    where
        T: Message,
        H: MessageHandler<T> + 'static,
        F: Fn() -> anyhow::Result<H> + Send + Sync + 'static,
    {
        Self {
            handler_name: type_name::<H>,
            payload_id: TypeId::of::<T>,
            payload_name: type_name::<T>,
            construct: Constructor::Dynamic(Arc::new(move || {
                let handler: Arc<dyn MessageHandler<T>> = Arc::new(construct()?);
                Ok(Arc::new(handler) as ErasedHandler)
            })),
        }
    }

    /// The handler's type name.
    pub fn handler_name(&self) -> &'static str {
        (self.handler_name)()
    }

    /// The payload type this handler is indexed under.
    pub fn payload_id(&self) -> TypeId {
        (self.payload_id)()
    }

    /// The payload's type name.
    pub fn payload_name(&self) -> &'static str {
        (self.payload_name)()
    }

    pub(crate) fn construct(&self) -> anyhow::Result<ErasedHandler> {
        match &self.construct {
            Constructor::Static(f) => f(),
            Constructor::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("handler", &self.handler_name())
            .field("payload", &self.payload_name())
            .finish()
    }
}

fn construct_default<T, H>() -> anyhow::Result<ErasedHandler>
where
    T: Message,
    H: MessageHandler<T> + Default + 'static,
{
    let handler: Arc<dyn MessageHandler<T>> = Arc::new(H::default());
    Ok(Arc::new(handler))
}

/// The ordered set of global handlers a bus is initialized with.
///
/// Built explicitly at the composition root, optionally seeded with every
/// registration submitted through [`register_handler!`](crate::register_handler).
/// Table order is dispatch order among handlers of the same payload type.
#[derive(Clone, Debug, Default)]
pub struct HandlerTable {
    registrations: Vec<HandlerRegistration>,
}

impl HandlerTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding every registration submitted with
    /// [`register_handler!`](crate::register_handler) anywhere in the binary.
    pub fn discovered() -> Self {
        let mut table = Self::new();
        table.extend_discovered();
        table
    }

    /// Appends every link-time submitted registration.
    pub fn extend_discovered(&mut self) {
        for registration in inventory::iter::<HandlerRegistration> {
            log::debug!(
                "Discovered message handler {} for {}",
                registration.handler_name(),
                registration.payload_name()
            );
            self.registrations.push(registration.clone());
        }
    }

    /// Appends a registration.
    pub fn register(&mut self, registration: HandlerRegistration) {
        self.registrations.push(registration);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, registration: HandlerRegistration) -> Self {
        self.register(registration);
        self
    }

    /// Returns the number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Iterates registrations in table order.
    pub fn iter(&self) -> impl Iterator<Item = &HandlerRegistration> {
        self.registrations.iter()
    }
}

/// The boxed future returned by a [`LocalHandler`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A dynamically subscribed callback for payloads of type `T`.
///
/// Cloning is cheap and clones share identity: [`MessageBus::unsubscribe`]
/// removes a subscription by pointer identity, so keep a clone of the handler
/// you subscribed.
///
/// [`MessageBus::unsubscribe`]: super::MessageBus::unsubscribe
pub struct LocalHandler<T> {
    callback: Arc<dyn Fn(T) -> HandlerFuture + Send + Sync>,
}

impl<T: Message> LocalHandler<T> {
    /// Wraps an async callback.
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            callback: Arc::new(move |msg| -> HandlerFuture { Box::pin(callback(msg)) }),
        }
    }

    /// Invokes the callback.
    pub fn call(&self, msg: T) -> HandlerFuture {
        (self.callback)(msg)
    }
}

impl<T> LocalHandler<T> {
    /// Returns `true` if both values refer to the same subscription.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<T> Clone for LocalHandler<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> fmt::Debug for LocalHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalHandler")
            .field("payload", &type_name::<T>())
            .finish()
    }
}

/// Submits `Handler` as a global handler for `Payload`, to be picked up by
/// [`HandlerTable::discovered`].
///
/// `Handler` must implement [`MessageHandler<Payload>`] and [`Default`].
///
/// ```rust,ignore
/// use tgf_core::message::{HandlerTable, MessageHandler};
///
/// #[derive(Clone)]
/// struct Ping;
///
/// #[derive(Default)]
/// struct PingLogger;
///
/// #[tgf_core::async_trait]
/// impl MessageHandler<Ping> for PingLogger {
///     async fn handle(&self, _msg: Ping) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
///
/// tgf_core::register_handler!(Ping => PingLogger);
///
/// assert!(HandlerTable::discovered()
///     .iter()
///     .any(|r| r.handler_name().ends_with("PingLogger")));
/// ```
#[macro_export]
macro_rules! register_handler {
    ($payload:ty => $handler:ty) => {
        $crate::inventory::submit! {
            $crate::message::HandlerRegistration::of::<$payload, $handler>()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Ping;

    #[derive(Default)]
    struct PingHandler;

    #[async_trait]
    impl MessageHandler<Ping> for PingHandler {
        async fn handle(&self, _msg: Ping) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Fallible;

    #[async_trait]
    impl MessageHandler<Ping> for Fallible {
        async fn handle(&self, _msg: Ping) -> anyhow::Result<()> {
            Ok(())
        }
    }

    crate::register_handler!(Ping => PingHandler);

    #[test]
    fn test_registration_metadata() {
        let registration = HandlerRegistration::of::<Ping, PingHandler>();
        assert_eq!(registration.payload_id(), TypeId::of::<Ping>());
        assert!(registration.handler_name().ends_with("PingHandler"));
        assert!(registration.payload_name().ends_with("Ping"));
        assert!(registration.construct().is_ok());
    }

    #[test]
    fn test_failing_constructor_surfaces_error() {
        let registration = HandlerRegistration::from_fn::<Ping, Fallible, _>(|| {
            anyhow::bail!("no default configuration")
        });
        let err = registration.construct().err().expect("constructor must fail");
        assert!(err.to_string().contains("no default configuration"));
    }

    #[test]
    fn test_discovered_includes_submitted_handlers() {
        let table = HandlerTable::discovered();
        assert!(table
            .iter()
            .any(|r| r.handler_name().ends_with("PingHandler")
                && r.payload_id() == TypeId::of::<Ping>()));
    }

    #[test]
    fn test_table_preserves_order() {
        let table = HandlerTable::new()
            .with(HandlerRegistration::of::<Ping, PingHandler>())
            .with(HandlerRegistration::from_fn::<Ping, Fallible, _>(|| Ok(Fallible)));
        let names: Vec<_> = table.iter().map(|r| r.handler_name()).collect();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("PingHandler"));
        assert!(names[1].ends_with("Fallible"));
    }

    #[tokio::test]
    async fn test_local_handler_identity() {
        let a = LocalHandler::new(|_: Ping| async { anyhow::Ok(()) });
        let b = a.clone();
        let c = LocalHandler::new(|_: Ping| async { anyhow::Ok(()) });
        assert!(a.same(&b));
        assert!(!a.same(&c));
        assert!(b.call(Ping).await.is_ok());
    }
}
