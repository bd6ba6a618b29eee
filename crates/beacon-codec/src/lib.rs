//! # beacon-codec
//!
//! Codecs that translate typed values to and from opaque payloads for Beacon
//! channels.
//!
//! A codec is an [`Encoder`]/[`Decoder`] pair. Both halves are stateless per
//! call and may be invoked concurrently from any thread.
//!
//! ## Codecs
//!
//! - [`JsonCodec`] - structured text, the default for byte channels
//! - [`MessagePackCodec`] - compact binary with named fields
//! - [`ConfiguredCodec`] - one of the above, selected from a [`CodecConfig`]
//!
//! ## Example
//!
//! ```rust
//! use tenvis_beacon_codec::{Decoder, Encoder, JsonCodec};
//!
//! let codec = JsonCodec::new();
//!
//! let payload = codec.encode(&vec![1, 2, 3]).unwrap();
//! let decoded: Vec<i32> = codec.decode(&payload).unwrap();
//! assert_eq!(decoded, vec![1, 2, 3]);
//! ```

pub mod codec;
pub mod config;
pub mod json;
pub mod msgpack;

pub use codec::{BoxError, CodecError, CodecErrorKind, ConfiguredCodec, Decoder, Encoder};
pub use config::{CodecConfig, ConfigError, Format};
pub use json::{JsonCodec, NonFiniteFloats};
pub use msgpack::MessagePackCodec;

/// Default maximum payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;
