//! # beacon-adapters
//!
//! Bridges from external event sources to Beacon channels.
//!
//! - **NotificationBus** - Injected name-keyed observer registry, exposed per
//!   name as a [`NotificationChannel`]
//! - **BroadcastChannel** - A `tokio::sync::broadcast` sender as a channel
//!
//! Every adapter implements the core capability traits, so it can be erased,
//! aggregated and layered with a codec like any other channel.

pub mod broadcast;
pub mod error;
pub mod notification;

pub use broadcast::{BroadcastChannel, BroadcastSubscription, DEFAULT_CAPACITY};
pub use error::AdapterError;
pub use notification::{
    Notification, NotificationBus, NotificationChannel, NotificationPayload,
    NotificationSubscription, Observer, ObserverToken,
};
