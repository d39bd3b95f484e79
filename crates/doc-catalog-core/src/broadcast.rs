//! Observer registry for collection changes.
//!
//! A [`Broadcaster`] lets one producer publish a snapshot of a collection to
//! any number of listeners. Delivery is synchronous and follows registration
//! order. Every listener receives its own `Vec<T>`, so a listener that
//! mutates what it was given cannot affect the other listeners or the
//! producer.
//!
//! Each delivery is isolated: a listener that returns `Err` or panics is
//! logged and skipped, and the next listener still runs. Failures never
//! reach the publisher.
//!
//! Publishes are serialized. A second `publish` from another thread waits
//! until the first has reached every listener, so deliveries never
//! interleave. A listener must not publish on the broadcaster that is
//! calling it.
//!
//! ```rust
//! use doc_catalog_core::broadcast::Broadcaster;
//! use std::sync::{Arc, Mutex};
//!
//! let bus: Broadcaster<u32> = Broadcaster::new("numbers");
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let sub = bus.subscribe(move |items| {
//!     sink.lock().unwrap().extend(items);
//!     Ok(())
//! });
//! bus.publish(&[1, 2, 3]);
//! drop(sub); // dropping the subscription unsubscribes
//! bus.publish(&[4]);
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
//! ```

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use anyhow::Result;

type Listener<T> = Arc<dyn Fn(Vec<T>) -> Result<()> + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// Something a [`Subscription`] can detach itself from.
trait RemoveListener: Send + Sync {
    fn remove(&self, id: u64);
}

impl<T: Send + 'static> RemoveListener for Mutex<Registry<T>> {
    fn remove(&self, id: u64) {
        let mut registry = self.lock().unwrap_or_else(PoisonError::into_inner);
        registry.listeners.retain(|(lid, _)| *lid != id);
    }
}

/// Publish/subscribe registry for snapshots of a collection of `T`.
///
/// Cloning a `Broadcaster` yields another handle to the same registry.
pub struct Broadcaster<T> {
    name: &'static str,
    registry: Arc<Mutex<Registry<T>>>,
    /// Held for a whole delivery round. Separate from `registry` so that
    /// listeners can subscribe and unsubscribe while being called.
    delivery: Arc<Mutex<()>>,
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            registry: self.registry.clone(),
            delivery: self.delivery.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Broadcaster<T> {
    /// Create an empty registry. `name` only appears in log output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
            delivery: Arc::new(Mutex::new(())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<T>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is unsubscribed or dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Vec<T>) -> Result<()> + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Arc::new(listener)));
            id
        };
        tracing::debug!(broadcaster = self.name, id, "listener subscribed");

        let strong: Arc<dyn RemoveListener> = self.registry.clone();
        Subscription {
            registry: Some(Arc::downgrade(&strong)),
            id,
        }
    }

    /// Deliver a copy of `items` to every listener in registration order.
    ///
    /// The listener list is snapshotted before delivery starts, so listeners
    /// may subscribe or unsubscribe while being called. Returns the number of
    /// listeners that failed.
    pub fn publish(&self, items: &[T]) -> usize {
        let _round = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let listeners: Vec<(u64, Listener<T>)> = self.lock().listeners.clone();
        let mut failed = 0;

        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(items.to_vec()))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    tracing::error!(broadcaster = self.name, id, "listener failed: {:#}", e);
                }
                Err(payload) => {
                    failed += 1;
                    tracing::error!(
                        broadcaster = self.name,
                        id,
                        "listener panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        failed
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Remove every listener. Outstanding subscriptions become no-ops.
    pub fn clear(&self) {
        self.lock().listeners.clear();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Disposer for one registered listener.
///
/// Dropping the handle unsubscribes. Calling [`unsubscribe`](Self::unsubscribe)
/// more than once is a no-op, as is unsubscribing after the broadcaster
/// itself is gone.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    registry: Option<Weak<dyn RemoveListener>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(&mut self) {
        if let Some(weak) = self.registry.take() {
            if let Some(registry) = weak.upgrade() {
                registry.remove(self.id);
            }
        }
    }

    /// Give up the handle but keep the listener registered for as long as
    /// the broadcaster lives.
    pub fn detach(mut self) {
        self.registry = None;
    }

    pub fn is_active(&self) -> bool {
        self.registry.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

enum Disposer {
    Subscription(Subscription),
    Callback(Box<dyn FnOnce() + Send>),
}

/// Teardown list owned by a component.
///
/// Everything pushed here is released together by [`dispose`](Self::dispose)
/// or when the list is dropped, in reverse order of registration.
#[derive(Default)]
pub struct Disposers {
    items: Vec<Disposer>,
}

impl Disposers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.items.push(Disposer::Subscription(subscription));
    }

    /// Register arbitrary cleanup, e.g. closing a connection.
    pub fn push_fn<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.items.push(Disposer::Callback(Box::new(f)));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dispose(&mut self) {
        while let Some(item) = self.items.pop() {
            match item {
                Disposer::Subscription(mut sub) => sub.unsubscribe(),
                Disposer::Callback(f) => f(),
            }
        }
    }
}

impl Drop for Disposers {
    fn drop(&mut self) {
        self.dispose();
    }
}
