//! Registry multiplexing one sequence of items onto any number of local subscribers
//!
//! Every call to [`Fanout::register`] creates an independent [`Registration`] backed by its own
//! unbounded channel. [`Fanout::broadcast`] iterates the registry and pushes a clone of the item
//! into each channel. A subscriber that is slow to consume its items never holds up the others.
//!
//! Registrations remove themselves from the registry when they are dropped. Owners of a fanout
//! may await [`Fanout::emptied`] to release upstream resources once nobody is listening anymore.

use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, Notify};
use tracing::trace;
use uuid::Uuid;

/// Key of a [`Registration`] within the registry
pub type RegistrationId = Uuid;

struct Registry<T> {
    senders: Mutex<HashMap<RegistrationId, mpsc::UnboundedSender<T>>>,
    emptied: Notify,
}

impl<T> Registry<T> {
    fn senders(&self) -> MutexGuard<'_, HashMap<RegistrationId, mpsc::UnboundedSender<T>>> {
        // Critical sections never panic half-way, a poisoned map is still consistent
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: &RegistrationId) {
        let mut senders = self.senders();

        if senders.remove(id).is_some() {
            trace!(%id, remaining = senders.len(), "Removed registration");

            if senders.is_empty() {
                self.emptied.notify_one();
            }
        }
    }
}

/// Broadcast primitive keyed by registration
pub struct Fanout<T> {
    registry: Arc<Registry<T>>,
}

impl<T> Clone for Fanout<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T> Default for Fanout<T> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Registry {
                senders: Mutex::new(HashMap::new()),
                emptied: Notify::new(),
            }),
        }
    }
}

impl<T: Clone> Fanout<T> {
    /// Creates a new registry without any registrations
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new registration which receives every item broadcast from now on
    pub fn register(&self) -> Registration<T> {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut senders = self.registry.senders();
        senders.insert(id, tx);
        trace!(%id, total = senders.len(), "Added registration");

        Registration {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Pushes a clone of the item to every registration and returns how many received it
    ///
    /// Registrations whose receiving end is gone are pruned on the way.
    pub fn broadcast(&self, item: T) -> usize {
        let mut senders = self.registry.senders();
        let before = senders.len();

        senders.retain(|_, tx| tx.send(item.clone()).is_ok());

        let delivered = senders.len();
        if delivered == 0 && before > 0 {
            self.registry.emptied.notify_one();
        }

        delivered
    }

    /// Number of active registrations
    pub fn len(&self) -> usize {
        self.registry.senders().len()
    }

    /// Whether there are no active registrations
    pub fn is_empty(&self) -> bool {
        self.registry.senders().is_empty()
    }

    /// Drops all registrations, their streams end after yielding already queued items
    pub fn close(&self) {
        self.registry.senders().clear();
    }

    /// Resolves once the last registration has been removed
    ///
    /// The notification may be stale by the time it is observed, callers should re-check [`Fanout::is_empty`].
    pub async fn emptied(&self) {
        self.registry.emptied.notified().await
    }
}

/// Receiving end of a [`Fanout`] registration
pub struct Registration<T> {
    id: RegistrationId,
    rx: mpsc::UnboundedReceiver<T>,
    registry: Weak<Registry<T>>,
}

impl<T> Unpin for Registration<T> {}

impl<T> Registration<T> {
    /// Key of this registration within the registry
    pub fn id(&self) -> RegistrationId {
        self.id
    }
}

impl<T> Stream for Registration<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> Drop for Registration<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.id);
        }
    }
}
