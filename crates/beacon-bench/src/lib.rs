//! Shared fixtures for the Beacon benchmarks.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tenvis_beacon_core::{SimpleChannel, SimpleSubscription, SubChannel};

/// A representative event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name.
    pub name: String,
    /// Sequence number.
    pub seq: u64,
    /// Measured value.
    pub value: f64,
    /// Free-form tags.
    pub tags: Vec<String>,
}

impl Event {
    /// Create an event with `tag_count` tags.
    #[must_use]
    pub fn sample(seq: u64, tag_count: usize) -> Self {
        Self {
            name: "bench:event".to_string(),
            seq,
            value: seq as f64 * 0.5,
            tags: (0..tag_count).map(|i| format!("tag-{i}")).collect(),
        }
    }
}

/// Attach `count` counting subscribers to `channel`.
///
/// Returns the shared counter and the subscriptions, which must be kept
/// for the subscribers to stay registered.
pub fn counting_subscribers<V: 'static>(
    channel: &SimpleChannel<V>,
    count: usize,
) -> (Arc<AtomicU64>, Vec<SimpleSubscription<V>>) {
    let hits = Arc::new(AtomicU64::new(0));
    let subscriptions = (0..count)
        .map(|_| {
            let hits = Arc::clone(&hits);
            channel.subscribe(move |_: &V| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect();
    (hits, subscriptions)
}
