//! Thread-safe synchronous broadcast channel.
//!
//! [`SimpleChannel`] keeps its subscribers behind a single mutex. `publish`
//! copies the handler list under the lock and invokes the copies after
//! releasing it, so a handler may subscribe to or cancel on the same channel
//! without deadlocking.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

use crate::channel::{Handler, PubChannel, SubChannel};
use crate::subscription::Subscription;

/// Atomic counter backing [`SubscriberId`].
static SUBSCRIBER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one registration.
///
/// Two registrations of the same closure get different identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        Self(SUBSCRIBER_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw identifier.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

type SubscriberSet<V> = Mutex<HashMap<SubscriberId, Handler<V>>>;

/// A synchronous broadcast channel.
///
/// Clones share the same subscriber set. Delivery stops once every clone is
/// dropped; outstanding [`SimpleSubscription`]s then cancel as no-ops.
pub struct SimpleChannel<V> {
    subscribers: Arc<SubscriberSet<V>>,
}

impl<V: 'static> SimpleChannel<V> {
    /// Create a channel with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Check if the channel has no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

impl<V: 'static> Default for SimpleChannel<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for SimpleChannel<V> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<V> fmt::Debug for SimpleChannel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleChannel")
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

impl<V> PubChannel<V> for SimpleChannel<V> {
    fn publish(&self, value: V) {
        let snapshot: Vec<Handler<V>> = self.subscribers.lock().values().cloned().collect();
        trace!(recipients = snapshot.len(), "Publishing value");

        for handler in &snapshot {
            handler(&value);
        }
    }
}

impl<V: 'static> SubChannel<V> for SimpleChannel<V> {
    type Subscription = SimpleSubscription<V>;

    fn subscribe_handler(&self, handler: Handler<V>) -> SimpleSubscription<V> {
        let id = SubscriberId::next();
        self.subscribers.lock().insert(id, handler);
        trace!(subscriber = %id, "Subscribed");

        SimpleSubscription {
            subscribers: Arc::downgrade(&self.subscribers),
            id,
        }
    }
}

/// Subscription to a [`SimpleChannel`].
///
/// Holds only a weak reference, so it never keeps the channel alive.
pub struct SimpleSubscription<V> {
    subscribers: Weak<SubscriberSet<V>>,
    id: SubscriberId,
}

impl<V> SimpleSubscription<V> {
    /// Get the identity of the registration.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Check if the registration is still present on a live channel.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscribers
            .upgrade()
            .map_or(false, |subscribers| subscribers.lock().contains_key(&self.id))
    }
}

impl<V: 'static> Subscription for SimpleSubscription<V> {
    fn cancel(&self) {
        let Some(subscribers) = self.subscribers.upgrade() else {
            trace!(subscriber = %self.id, "Channel already gone");
            return;
        };

        // Drop the handler outside the lock; it may own guards for this channel.
        let removed = subscribers.lock().remove(&self.id);
        if removed.is_some() {
            trace!(subscriber = %self.id, "Cancelled");
        }
    }
}

impl<V> fmt::Debug for SimpleSubscription<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleSubscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
