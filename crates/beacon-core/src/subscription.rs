//! Subscription handles.
//!
//! A [`Subscription`] represents one registration on a channel. Cancelling it
//! stops future deliveries to that registration. Handles compose:
//!
//! - [`AnySubscription`] - erased, cloneable handle
//! - [`AggregateSubscription`] - many handles cancelled as one
//! - [`AutoSubscription`] - cancels when dropped
//! - [`SharedAutoSubscription`] - ref-counted, hashable [`AutoSubscription`]
//!
//! Dropping a plain subscription does **not** cancel it. Use
//! [`Subscription::auto_cancel`] to tie the registration to a scope.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A cancellable handle for one channel registration.
pub trait Subscription: Send + Sync {
    /// Stop future deliveries to this registration.
    ///
    /// Safe to call any number of times, and concurrently with an in-flight
    /// publish. A delivery whose snapshot was already taken may still
    /// complete after this returns.
    fn cancel(&self);

    /// Erase the concrete type.
    fn erase(self) -> AnySubscription
    where
        Self: Sized + 'static,
    {
        AnySubscription::new(self)
    }

    /// Cancel automatically when the returned guard is dropped.
    fn auto_cancel(self) -> AutoSubscription
    where
        Self: Sized + 'static,
    {
        AutoSubscription::new(self)
    }
}

impl<S: Subscription + ?Sized> Subscription for Box<S> {
    fn cancel(&self) {
        (**self).cancel();
    }
}

impl<S: Subscription + ?Sized> Subscription for Arc<S> {
    fn cancel(&self) {
        (**self).cancel();
    }
}

/// A type-erased subscription.
#[derive(Clone)]
pub struct AnySubscription {
    inner: Arc<dyn Subscription>,
}

impl AnySubscription {
    /// Wrap a concrete subscription.
    #[must_use]
    pub fn new<S: Subscription + 'static>(subscription: S) -> Self {
        Self {
            inner: Arc::new(subscription),
        }
    }
}

impl Subscription for AnySubscription {
    fn cancel(&self) {
        self.inner.cancel();
    }

    fn erase(self) -> AnySubscription {
        self
    }
}

impl fmt::Debug for AnySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnySubscription").finish_non_exhaustive()
    }
}

/// Several subscriptions, possibly from different channels, cancelled together.
#[derive(Debug, Clone, Default)]
pub struct AggregateSubscription {
    subscriptions: Vec<AnySubscription>,
}

impl AggregateSubscription {
    /// Create an aggregate from any sequence of subscriptions.
    #[must_use]
    pub fn new<I, S>(subscriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Subscription + 'static,
    {
        subscriptions.into_iter().collect()
    }

    /// Add a subscription to the aggregate.
    pub fn push<S: Subscription + 'static>(&mut self, subscription: S) {
        self.subscriptions.push(subscription.erase());
    }

    /// Add a subscription, builder style.
    #[must_use]
    pub fn with<S: Subscription + 'static>(mut self, subscription: S) -> Self {
        self.push(subscription);
        self
    }

    /// Get the number of member subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Check if the aggregate has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl Subscription for AggregateSubscription {
    fn cancel(&self) {
        for subscription in &self.subscriptions {
            subscription.cancel();
        }
    }
}

impl<S: Subscription + 'static> FromIterator<S> for AggregateSubscription {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            subscriptions: iter.into_iter().map(Subscription::erase).collect(),
        }
    }
}

impl<S: Subscription + 'static> Extend<S> for AggregateSubscription {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.subscriptions
            .extend(iter.into_iter().map(Subscription::erase));
    }
}

/// Collects an iterator of subscriptions into an [`AggregateSubscription`].
pub trait SubscriptionIterExt: Iterator {
    /// Aggregate every subscription yielded by this iterator.
    fn aggregated(self) -> AggregateSubscription
    where
        Self: Sized,
        Self::Item: Subscription + 'static,
    {
        self.collect()
    }
}

impl<I: Iterator> SubscriptionIterExt for I {}

/// Cancels the wrapped subscription when dropped.
///
/// Not `Clone`: exactly one owner decides when the registration ends. Use
/// [`AutoSubscription::share`] for shared ownership.
#[must_use = "dropping an AutoSubscription cancels it immediately"]
pub struct AutoSubscription {
    subscription: AnySubscription,
}

impl AutoSubscription {
    /// Take ownership of a subscription.
    pub fn new<S: Subscription + 'static>(subscription: S) -> Self {
        Self {
            subscription: subscription.erase(),
        }
    }

    /// Convert into a reference-counted, hashable handle.
    pub fn share(self) -> SharedAutoSubscription {
        SharedAutoSubscription {
            inner: Arc::new(self),
        }
    }

    /// Move this guard into a collection that owns it.
    pub fn store_in<C: Extend<AutoSubscription>>(self, collection: &mut C) {
        collection.extend(std::iter::once(self));
    }
}

impl Drop for AutoSubscription {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}

impl fmt::Debug for AutoSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSubscription").finish_non_exhaustive()
    }
}

/// A shared [`AutoSubscription`].
///
/// Clones refer to the same registration, which is cancelled when the last
/// clone is dropped. Equality and hashing use identity, so two shares of
/// different guards are always distinct set members.
#[derive(Clone)]
#[must_use = "dropping the last SharedAutoSubscription cancels it"]
pub struct SharedAutoSubscription {
    inner: Arc<AutoSubscription>,
}

impl SharedAutoSubscription {
    /// Insert a clone of this handle into `set`.
    ///
    /// Returns `true` if the set did not already hold this handle.
    pub fn store_in(&self, set: &mut HashSet<SharedAutoSubscription>) -> bool {
        set.insert(self.clone())
    }
}

impl PartialEq for SharedAutoSubscription {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SharedAutoSubscription {}

impl Hash for SharedAutoSubscription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for SharedAutoSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedAutoSubscription")
            .field(&Arc::as_ptr(&self.inner))
            .finish()
    }
}
