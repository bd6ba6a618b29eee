//! tokio broadcast sender as a channel.
//!
//! Unlike the core channels, delivery here is asynchronous: each subscriber
//! owns a broadcast receiver drained by a task on the captured runtime.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tenvis_beacon_core::{Handler, PubChannel, SubChannel, Subscription};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};

use crate::error::AdapterError;

/// Default broadcast capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A channel backed by a [`broadcast::Sender`].
pub struct BroadcastChannel<V> {
    sender: broadcast::Sender<V>,
    runtime: Handle,
}

impl<V: Clone + Send + Sync + 'static> BroadcastChannel<V> {
    /// Create a channel on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error outside a runtime or if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, AdapterError> {
        Self::with_handle(capacity, Handle::try_current()?)
    }

    /// Create a channel whose subscribers run on `runtime`.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is zero.
    pub fn with_handle(capacity: usize, runtime: Handle) -> Result<Self, AdapterError> {
        if capacity == 0 {
            return Err(AdapterError::InvalidCapacity(capacity));
        }
        let (sender, _) = broadcast::channel(capacity);
        Ok(Self::from_sender(sender, runtime))
    }

    /// Wrap an existing sender.
    #[must_use]
    pub fn from_sender(sender: broadcast::Sender<V>, runtime: Handle) -> Self {
        Self { sender, runtime }
    }

    /// Get the sender, for producers outside the channel API.
    #[must_use]
    pub fn sender(&self) -> &broadcast::Sender<V> {
        &self.sender
    }

    /// Get the number of live receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<V> Clone for BroadcastChannel<V> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<V> fmt::Debug for BroadcastChannel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastChannel")
            .field("receivers", &self.sender.receiver_count())
            .finish_non_exhaustive()
    }
}

impl<V> PubChannel<V> for BroadcastChannel<V> {
    fn publish(&self, value: V) {
        // Sending only fails when nobody is listening.
        if self.sender.send(value).is_err() {
            trace!("Broadcast without receivers");
        }
    }
}

impl<V: Clone + Send + 'static> SubChannel<V> for BroadcastChannel<V> {
    type Subscription = BroadcastSubscription;

    fn subscribe_handler(&self, handler: Handler<V>) -> BroadcastSubscription {
        // Subscribe before spawning so values published after this call are seen.
        let mut receiver = self.sender.subscribe();
        let cancelled = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&cancelled);
        let task = self.runtime.spawn(async move {
            loop {
                match receiver.recv().await {
                    // Abort lands only at the next yield point.
                    Ok(_) if flag.load(Ordering::Acquire) => break,
                    Ok(value) => handler(&value),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Broadcast subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Broadcast subscriber finished");
        });
        debug!("Broadcast subscriber attached");

        BroadcastSubscription {
            task: task.abort_handle(),
            cancelled,
        }
    }
}

/// Subscription to a [`BroadcastChannel`]; cancelling aborts the receiving task.
#[derive(Debug)]
pub struct BroadcastSubscription {
    task: AbortHandle,
    cancelled: Arc<AtomicBool>,
}

impl BroadcastSubscription {
    /// Check if the receiving task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Subscription for BroadcastSubscription {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.task.abort();
    }
}
