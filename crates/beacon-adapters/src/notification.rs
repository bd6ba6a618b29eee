//! Name-keyed notification bus.
//!
//! A [`NotificationBus`] is a registry of observers keyed by notification
//! name. It is created and passed around explicitly; there is no global
//! instance. [`NotificationBus::channel`] exposes one name as a
//! [`Channel`](tenvis_beacon_core::Channel) of [`NotificationPayload`]s.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tenvis_beacon_core::{Handler, PubChannel, SubChannel, Subscription};
use tracing::{debug, trace};

/// An observer callback.
pub type Observer = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Identity of one observer registration on a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

impl fmt::Display for ObserverToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obs_{}", self.0)
    }
}

/// Body of a notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Object the notification is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
    /// Free-form extra fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<Map<String, Value>>,
}

impl NotificationPayload {
    /// Create an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the object.
    #[must_use]
    pub fn with_object(mut self, object: impl Into<Value>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Add a user info entry.
    #[must_use]
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.user_info
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// A named notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Notification name.
    pub name: String,
    /// Notification body.
    pub payload: NotificationPayload,
}

impl Notification {
    /// Create a notification with an empty payload.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_payload(name, NotificationPayload::default())
    }

    /// Create a notification with a payload.
    #[must_use]
    pub fn with_payload(name: impl Into<String>, payload: NotificationPayload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Get the object, if any.
    #[must_use]
    pub fn object(&self) -> Option<&Value> {
        self.payload.object.as_ref()
    }

    /// Get the user info, if any.
    #[must_use]
    pub fn user_info(&self) -> Option<&Map<String, Value>> {
        self.payload.user_info.as_ref()
    }
}

struct BusInner {
    observers: DashMap<String, Vec<(ObserverToken, Observer)>>,
    next_token: AtomicU64,
}

impl BusInner {
    fn remove(&self, name: &str, token: ObserverToken) -> bool {
        let removed = match self.observers.get_mut(name) {
            Some(mut entry) => {
                let before = entry.len();
                entry.retain(|(t, _)| *t != token);
                before != entry.len()
            }
            None => false,
        };

        self.observers.remove_if(name, |_, entry| entry.is_empty());
        if removed {
            debug!(notification = %name, observer = %token, "Observer removed");
        }
        removed
    }
}

/// An injected notification bus.
///
/// Clones share the same registry.
#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl NotificationBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                observers: DashMap::new(),
                next_token: AtomicU64::new(1),
            }),
        }
    }

    /// Register an observer for `name`.
    pub fn add_observer<F>(&self, name: impl Into<String>, observer: F) -> ObserverToken
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let name = name.into();
        let token = ObserverToken(self.inner.next_token.fetch_add(1, Ordering::Relaxed));
        debug!(notification = %name, observer = %token, "Observer added");

        self.inner
            .observers
            .entry(name)
            .or_default()
            .push((token, Arc::new(observer)));
        token
    }

    /// Remove an observer.
    ///
    /// Returns `false` if the token was not registered under `name`.
    pub fn remove_observer(&self, name: &str, token: ObserverToken) -> bool {
        self.inner.remove(name, token)
    }

    /// Deliver a notification to every observer of its name.
    ///
    /// Observers run on the caller's thread, outside the registry guard.
    /// Returns the number of observers notified.
    pub fn post(&self, notification: Notification) -> usize {
        let snapshot: Vec<Observer> = self
            .inner
            .observers
            .get(&notification.name)
            .map(|entry| entry.iter().map(|(_, o)| Arc::clone(o)).collect())
            .unwrap_or_default();

        trace!(notification = %notification.name, recipients = snapshot.len(), "Posting");
        for observer in &snapshot {
            observer(&notification);
        }
        snapshot.len()
    }

    /// Get the number of observers registered for `name`.
    #[must_use]
    pub fn observer_count(&self, name: &str) -> usize {
        self.inner.observers.get(name).map_or(0, |entry| entry.len())
    }

    /// Get a channel view of one notification name.
    #[must_use]
    pub fn channel(&self, name: impl Into<String>) -> NotificationChannel {
        NotificationChannel {
            bus: self.clone(),
            name: name.into(),
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("names", &self.inner.observers.len())
            .finish()
    }
}

/// One notification name on a bus, as a channel.
#[derive(Debug, Clone)]
pub struct NotificationChannel {
    bus: NotificationBus,
    name: String,
}

impl NotificationChannel {
    /// Get the notification name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the underlying bus.
    #[must_use]
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }
}

impl PubChannel<NotificationPayload> for NotificationChannel {
    fn publish(&self, payload: NotificationPayload) {
        self.bus
            .post(Notification::with_payload(self.name.clone(), payload));
    }
}

impl SubChannel<NotificationPayload> for NotificationChannel {
    type Subscription = NotificationSubscription;

    fn subscribe_handler(&self, handler: Handler<NotificationPayload>) -> NotificationSubscription {
        let token = self
            .bus
            .add_observer(self.name.clone(), move |n: &Notification| handler(&n.payload));

        NotificationSubscription {
            bus: Arc::downgrade(&self.bus.inner),
            name: self.name.clone(),
            token,
            cancelled: AtomicBool::new(false),
        }
    }
}

/// Observer registration made through a [`NotificationChannel`].
pub struct NotificationSubscription {
    bus: Weak<BusInner>,
    name: String,
    token: ObserverToken,
    cancelled: AtomicBool,
}

impl NotificationSubscription {
    /// Get the observer token.
    #[must_use]
    pub fn token(&self) -> ObserverToken {
        self.token
    }
}

impl Subscription for NotificationSubscription {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(&self.name, self.token);
        }
    }
}

impl fmt::Debug for NotificationSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationSubscription")
            .field("name", &self.name)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
