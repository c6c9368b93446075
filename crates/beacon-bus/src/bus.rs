//! Topic registry and dispatch.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::SubscriberError;

/// Named channel identifying a class of notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A fully materialised event was accepted into the event cache.
    Event,
    /// A new session started.
    Session,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A consumer of payloads published on the bus.
pub trait Subscriber<P>: Send + Sync {
    fn notify(&self, payload: &P) -> Result<(), SubscriberError>;
}

impl<P, F> Subscriber<P> for F
where
    F: Fn(&P) -> Result<(), SubscriberError> + Send + Sync,
{
    fn notify(&self, payload: &P) -> Result<(), SubscriberError> {
        self(payload)
    }
}

type SubscriberList<P> = Vec<Arc<dyn Subscriber<P>>>;

/// Process-wide synchronous publish/subscribe registry.
pub struct EventBus<P> {
    subscribers: Mutex<HashMap<Topic, SubscriberList<P>>>,
}

impl<P: 'static> EventBus<P> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `subscriber` for `topic`.
    ///
    /// The same subscriber may be registered more than once; it is then
    /// notified once per registration.
    pub fn subscribe(&self, topic: Topic, subscriber: Arc<dyn Subscriber<P>>) {
        self.lock().entry(topic).or_default().push(subscriber);
    }

    /// Registers an infallible closure and returns the handle needed to
    /// unsubscribe it later.
    pub fn subscribe_fn<F>(&self, topic: Topic, f: F) -> Arc<dyn Subscriber<P>>
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let subscriber: Arc<dyn Subscriber<P>> = Arc::new(move |payload: &P| {
            f(payload);
            Ok::<(), SubscriberError>(())
        });
        self.subscribe(topic, Arc::clone(&subscriber));
        subscriber
    }

    /// Removes the first registration of `subscriber` for `topic`.
    ///
    /// Returns `false` if it was not registered.
    pub fn unsubscribe(&self, topic: Topic, subscriber: &Arc<dyn Subscriber<P>>) -> bool {
        let mut subscribers = self.lock();
        let Some(list) = subscribers.get_mut(&topic) else {
            return false;
        };
        let target = Arc::as_ptr(subscriber) as *const ();
        let Some(index) = list
            .iter()
            .position(|s| Arc::as_ptr(s) as *const () == target)
        else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            subscribers.remove(&topic);
        }
        true
    }

    /// Synchronously notifies every subscriber of `topic`.
    ///
    /// Returns the number of subscribers that handled the payload without
    /// failing.
    pub fn dispatch(&self, topic: Topic, payload: &P) -> usize {
        let snapshot: SubscriberList<P> = match self.lock().get(&topic) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for (position, subscriber) in snapshot.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber.notify(payload))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(%topic, position, error = %e, "bus subscriber failed");
                }
                Err(_) => {
                    tracing::error!(%topic, position, "bus subscriber panicked");
                }
            }
        }
        delivered
    }

    /// Number of registrations currently held for `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.lock().get(&topic).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Topic, SubscriberList<P>>> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Only registration happens under the lock, so the map is
                // still consistent.
                tracing::error!("event bus lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl<P: 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self
            .subscribers
            .lock()
            .map(|s| s.iter().map(|(t, l)| (*t, l.len())).collect::<Vec<_>>())
            .unwrap_or_default();
        f.debug_struct("EventBus").field("topics", &topics).finish()
    }
}
