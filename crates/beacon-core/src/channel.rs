//! Channel capabilities and type erasure.
//!
//! A channel is two capabilities over one fixed value type:
//!
//! - [`PubChannel`] - synchronously deliver a value to every current subscriber
//! - [`SubChannel`] - register a handler and get back a [`Subscription`]
//!
//! [`Channel`] is implemented for every type that has both. The erased
//! facades [`AnyPubChannel`], [`AnySubChannel`] and [`AnyChannel`] hide the
//! concrete implementation behind one cloneable type, so channels of
//! different origin can be stored and passed around uniformly.

use std::fmt;
use std::sync::Arc;

use crate::subscription::{AnySubscription, Subscription};

/// A subscriber's handler.
///
/// Handlers may be invoked repeatedly and from several threads at once.
pub type Handler<V> = Arc<dyn Fn(&V) + Send + Sync>;

/// The publish capability.
pub trait PubChannel<V> {
    /// Deliver `value` to every currently registered subscriber.
    ///
    /// Runs on the caller's thread. A panicking handler is not intercepted.
    fn publish(&self, value: V);

    /// Erase the concrete type, keeping only the publish capability.
    fn erase_pub(self) -> AnyPubChannel<V>
    where
        Self: Sized + Send + Sync + 'static,
    {
        AnyPubChannel::new(self)
    }
}

/// The subscribe capability.
pub trait SubChannel<V> {
    /// Handle returned for each registration.
    type Subscription: Subscription + 'static;

    /// Register a shared handler.
    fn subscribe_handler(&self, handler: Handler<V>) -> Self::Subscription;

    /// Register a closure.
    fn subscribe<F>(&self, handler: F) -> Self::Subscription
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        self.subscribe_handler(Arc::new(handler))
    }

    /// Erase the concrete type, keeping only the subscribe capability.
    fn erase_sub(self) -> AnySubChannel<V>
    where
        Self: Sized + Send + Sync + 'static,
    {
        AnySubChannel::new(self)
    }
}

/// Both capabilities over the same value type.
pub trait Channel<V>: PubChannel<V> + SubChannel<V> {
    /// Erase the concrete type.
    fn erase(self) -> AnyChannel<V>
    where
        Self: Sized + Send + Sync + 'static,
        V: 'static,
    {
        AnyChannel::new(self)
    }
}

impl<V, C> Channel<V> for C where C: PubChannel<V> + SubChannel<V> + ?Sized {}

impl<V, C: PubChannel<V> + ?Sized> PubChannel<V> for Arc<C> {
    fn publish(&self, value: V) {
        (**self).publish(value);
    }
}

impl<V, C: SubChannel<V> + ?Sized> SubChannel<V> for Arc<C> {
    type Subscription = C::Subscription;

    fn subscribe_handler(&self, handler: Handler<V>) -> Self::Subscription {
        (**self).subscribe_handler(handler)
    }
}

/// Zero-argument publish for channels of `()`.
pub trait UnitPubChannel: PubChannel<()> {
    /// Publish the unit value.
    fn publish_unit(&self) {
        self.publish(());
    }
}

impl<C: PubChannel<()> + ?Sized> UnitPubChannel for C {}

/// Zero-argument subscribe for channels of `()`.
pub trait UnitSubChannel: SubChannel<()> {
    /// Register a handler that takes no arguments.
    fn subscribe_unit<F>(&self, handler: F) -> Self::Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(move |_: &()| handler())
    }
}

impl<C: SubChannel<()> + ?Sized> UnitSubChannel for C {}

/// Object-safe view of [`SubChannel`].
trait ErasedSubscribe<V>: Send + Sync {
    fn subscribe_erased(&self, handler: Handler<V>) -> AnySubscription;
}

impl<V, C> ErasedSubscribe<V> for C
where
    C: SubChannel<V> + Send + Sync,
{
    fn subscribe_erased(&self, handler: Handler<V>) -> AnySubscription {
        self.subscribe_handler(handler).erase()
    }
}

/// Object-safe view of [`Channel`].
trait ErasedChannel<V>: PubChannel<V> + ErasedSubscribe<V> {}

impl<V, C> ErasedChannel<V> for C where C: PubChannel<V> + SubChannel<V> + Send + Sync {}

/// A publish-only channel with its concrete type erased.
pub struct AnyPubChannel<V> {
    inner: Arc<dyn PubChannel<V> + Send + Sync>,
}

impl<V> AnyPubChannel<V> {
    /// Wrap a concrete channel.
    #[must_use]
    pub fn new<C>(channel: C) -> Self
    where
        C: PubChannel<V> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(channel),
        }
    }
}

impl<V> PubChannel<V> for AnyPubChannel<V> {
    fn publish(&self, value: V) {
        self.inner.publish(value);
    }

    fn erase_pub(self) -> AnyPubChannel<V> {
        self
    }
}

impl<V> Clone for AnyPubChannel<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for AnyPubChannel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyPubChannel").finish_non_exhaustive()
    }
}

/// A subscribe-only channel with its concrete type erased.
pub struct AnySubChannel<V> {
    inner: Arc<dyn ErasedSubscribe<V>>,
}

impl<V> AnySubChannel<V> {
    /// Wrap a concrete channel.
    #[must_use]
    pub fn new<C>(channel: C) -> Self
    where
        C: SubChannel<V> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(channel),
        }
    }
}

impl<V> SubChannel<V> for AnySubChannel<V> {
    type Subscription = AnySubscription;

    fn subscribe_handler(&self, handler: Handler<V>) -> AnySubscription {
        self.inner.subscribe_erased(handler)
    }

    fn erase_sub(self) -> AnySubChannel<V> {
        self
    }
}

impl<V> Clone for AnySubChannel<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for AnySubChannel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnySubChannel").finish_non_exhaustive()
    }
}

/// A full channel with its concrete type erased.
pub struct AnyChannel<V> {
    inner: Arc<dyn ErasedChannel<V>>,
}

impl<V: 'static> AnyChannel<V> {
    /// Wrap a concrete channel.
    #[must_use]
    pub fn new<C>(channel: C) -> Self
    where
        C: PubChannel<V> + SubChannel<V> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(channel),
        }
    }

    /// Get a publish-only view of this channel.
    #[must_use]
    pub fn publisher(&self) -> AnyPubChannel<V> {
        AnyPubChannel::new(self.clone())
    }

    /// Get a subscribe-only view of this channel.
    #[must_use]
    pub fn subscriber(&self) -> AnySubChannel<V> {
        AnySubChannel::new(self.clone())
    }
}

impl<V> PubChannel<V> for AnyChannel<V> {
    fn publish(&self, value: V) {
        self.inner.publish(value);
    }
}

impl<V> SubChannel<V> for AnyChannel<V> {
    type Subscription = AnySubscription;

    fn subscribe_handler(&self, handler: Handler<V>) -> AnySubscription {
        self.inner.subscribe_erased(handler)
    }
}

impl<V> Clone for AnyChannel<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for AnyChannel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyChannel").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple::SimpleChannel;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Channel that doubles every value before forwarding it.
    struct Doubling {
        inner: SimpleChannel<i32>,
    }

    impl PubChannel<i32> for Doubling {
        fn publish(&self, value: i32) {
            self.inner.publish(value * 2);
        }
    }

    impl SubChannel<i32> for Doubling {
        type Subscription = <SimpleChannel<i32> as SubChannel<i32>>::Subscription;

        fn subscribe_handler(&self, handler: Handler<i32>) -> Self::Subscription {
            self.inner.subscribe_handler(handler)
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, impl Fn(&i32) + Send + Sync + 'static) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        (received, move |value: &i32| sink.lock().push(*value))
    }

    #[test]
    fn test_heterogeneous_channels_erased() {
        let channels: Vec<AnyChannel<i32>> = vec![
            SimpleChannel::new().erase(),
            Doubling {
                inner: SimpleChannel::new(),
            }
            .erase(),
        ];

        let (received, handler) = recorder();
        let handler = Arc::new(handler);
        for channel in &channels {
            let handler = Arc::clone(&handler);
            let _ = channel.subscribe(move |value| handler(value));
        }

        for channel in &channels {
            channel.publish(21);
        }

        let mut received = received.lock().clone();
        received.sort_unstable();
        assert_eq!(received, vec![21, 42]);
    }

    #[test]
    fn test_erased_subscription_cancels() {
        let channel = SimpleChannel::<i32>::new();
        let erased = channel.clone().erase();

        let (received, handler) = recorder();
        let subscription = erased.subscribe(handler);
        erased.publish(1);

        subscription.cancel();
        erased.publish(2);
        channel.publish(3);

        assert_eq!(*received.lock(), vec![1]);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_split_views() {
        let channel = SimpleChannel::<i32>::new().erase();
        let publisher: AnyPubChannel<i32> = channel.publisher();
        let subscriber: AnySubChannel<i32> = channel.subscriber();

        let (received, handler) = recorder();
        let _subscription = subscriber.subscribe(handler);
        publisher.publish(7);

        assert_eq!(*received.lock(), vec![7]);
    }

    #[test]
    fn test_erase_is_idempotent() {
        let channel = SimpleChannel::<i32>::new();
        let publisher = channel.clone().erase_pub().erase_pub();
        let subscriber = channel.erase_sub().erase_sub();

        let (received, handler) = recorder();
        let _subscription = subscriber.subscribe(handler);
        publisher.publish(5);

        assert_eq!(*received.lock(), vec![5]);
    }

    #[test]
    fn test_unit_channel_overloads() {
        let channel = SimpleChannel::<()>::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        let _subscription = channel.subscribe_unit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        channel.publish_unit();
        channel.erase().publish_unit();

        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shared_arc_channel() {
        let channel = Arc::new(SimpleChannel::<i32>::new());
        let (received, handler) = recorder();

        let _subscription = channel.subscribe(handler);
        Arc::clone(&channel).erase().publish(9);

        assert_eq!(*received.lock(), vec![9]);
    }
}
