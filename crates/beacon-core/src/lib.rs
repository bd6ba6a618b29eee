//! # beacon-core
//!
//! Type-safe in-process publish/subscribe for decoupling components inside
//! one process.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Subscription** - Cancellable handles and their combinators
//! - **Channel** - Publish/subscribe capabilities and type-erased facades
//! - **SimpleChannel** - Thread-safe synchronous broadcast
//! - **SerializingChannel** - Typed channel over a payload channel and a codec
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────────┐     ┌───────────────┐
//! │ SerializingChannel│────▶│ Channel<Bytes>  │────▶│ SimpleChannel │
//! └──────────────────┘     │ (any base)      │     │ or an adapter │
//!          │               └─────────────────┘     └───────────────┘
//!          ▼
//!   ┌─────────────┐
//!   │ Subscription│  cancel / auto-cancel / aggregate
//!   └─────────────┘
//! ```
//!
//! Nothing here spawns threads or tasks. `publish` runs every handler on the
//! caller's thread, and handlers never run under a channel lock.
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use tenvis_beacon_core::{ByteChannelExt, ErrorHandlers, PubChannel, SimpleChannel, SubChannel};
//!
//! let base = SimpleChannel::<Bytes>::new();
//! let typed = base.clone().json_coded::<Vec<u32>>(ErrorHandlers::none());
//!
//! let _subscription = typed.subscribe(|values: &Vec<u32>| assert_eq!(values, &[1, 2]));
//! typed.publish(vec![1, 2]);
//! ```

pub mod channel;
pub mod serializing;
pub mod simple;
pub mod subscription;

pub use channel::{
    AnyChannel, AnyPubChannel, AnySubChannel, Channel, Handler, PubChannel, SubChannel,
    UnitPubChannel, UnitSubChannel,
};
pub use serializing::{
    ByteChannelExt, CodedChannelExt, Decoded, ErrorHandler, ErrorHandlers, JsonChannel,
    MessagePackChannel, SerializingChannel, SerializingSubscription,
};
pub use simple::{SimpleChannel, SimpleSubscription, SubscriberId};
pub use subscription::{
    AggregateSubscription, AnySubscription, AutoSubscription, SharedAutoSubscription,
    Subscription, SubscriptionIterExt,
};

pub use tenvis_beacon_codec as codec;
