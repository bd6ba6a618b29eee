//! Encoder/decoder traits and the codec error taxonomy.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::{CodecConfig, Format};
use crate::json::JsonCodec;
use crate::msgpack::MessagePackCodec;

/// Boxed error carried inside a [`CodecError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which direction of a codec failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecErrorKind {
    /// A value could not be turned into a payload.
    Encoding,
    /// A payload could not be turned into a value.
    Decoding,
}

/// Errors that can occur while encoding or decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value is not representable in the codec's payload form.
    #[error("Encoding error: {0}")]
    Encode(#[source] BoxError),

    /// The payload is malformed or does not match the expected schema.
    #[error("Decoding error: {0}")]
    Decode(#[source] BoxError),

    /// The payload exceeds the configured size limit.
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size in bytes.
        size: usize,
        /// Configured limit in bytes.
        max: usize,
        /// Direction that hit the limit.
        kind: CodecErrorKind,
    },
}

impl CodecError {
    /// Wrap an error raised while encoding.
    pub fn encode(err: impl Into<BoxError>) -> Self {
        Self::Encode(err.into())
    }

    /// Wrap an error raised while decoding.
    pub fn decode(err: impl Into<BoxError>) -> Self {
        Self::Decode(err.into())
    }

    /// Classify the error by direction.
    #[must_use]
    pub fn kind(&self) -> CodecErrorKind {
        match self {
            Self::Encode(_) => CodecErrorKind::Encoding,
            Self::Decode(_) => CodecErrorKind::Decoding,
            Self::PayloadTooLarge { kind, .. } => *kind,
        }
    }

    /// Returns `true` for encoding-side failures.
    #[must_use]
    pub fn is_encoding(&self) -> bool {
        self.kind() == CodecErrorKind::Encoding
    }

    /// Returns `true` for decoding-side failures.
    #[must_use]
    pub fn is_decoding(&self) -> bool {
        self.kind() == CodecErrorKind::Decoding
    }
}

/// Reject payloads over `max` bytes.
pub(crate) fn check_payload_size(
    size: usize,
    max: usize,
    kind: CodecErrorKind,
) -> Result<(), CodecError> {
    if size > max {
        return Err(CodecError::PayloadTooLarge { size, max, kind });
    }
    Ok(())
}

/// Turns values of type `V` into payloads.
///
/// Implementations must tolerate concurrent calls.
pub trait Encoder<V: ?Sized>: Send + Sync {
    /// Payload representation produced by this encoder.
    type Payload;

    /// Encode a value.
    ///
    /// # Errors
    ///
    /// Returns an encoding-kind [`CodecError`] if the value cannot be represented.
    fn encode(&self, value: &V) -> Result<Self::Payload, CodecError>;
}

/// Turns payloads back into values of type `V`.
///
/// Implementations must tolerate concurrent calls.
pub trait Decoder<V>: Send + Sync {
    /// Payload representation consumed by this decoder.
    type Payload;

    /// Decode a payload.
    ///
    /// # Errors
    ///
    /// Returns a decoding-kind [`CodecError`] if the payload is malformed.
    fn decode(&self, payload: &Self::Payload) -> Result<V, CodecError>;
}

/// A codec selected at runtime from a [`CodecConfig`].
#[derive(Debug, Clone)]
pub enum ConfiguredCodec {
    /// JSON text.
    Json(JsonCodec),
    /// MessagePack with named fields.
    MessagePack(MessagePackCodec),
}

impl ConfiguredCodec {
    /// Build the codec described by `config`.
    #[must_use]
    pub fn from_config(config: &CodecConfig) -> Self {
        match config.format {
            Format::Json => Self::Json(
                JsonCodec::new()
                    .with_pretty(config.pretty)
                    .with_non_finite_floats(config.non_finite_floats)
                    .with_max_payload_size(config.max_payload_size),
            ),
            Format::MessagePack => Self::MessagePack(
                MessagePackCodec::new().with_max_payload_size(config.max_payload_size),
            ),
        }
    }

    /// Get the selected format.
    #[must_use]
    pub fn format(&self) -> Format {
        match self {
            Self::Json(_) => Format::Json,
            Self::MessagePack(_) => Format::MessagePack,
        }
    }
}

impl Default for ConfiguredCodec {
    fn default() -> Self {
        Self::Json(JsonCodec::default())
    }
}

impl<V: Serialize + ?Sized> Encoder<V> for ConfiguredCodec {
    type Payload = Bytes;

    fn encode(&self, value: &V) -> Result<Bytes, CodecError> {
        match self {
            Self::Json(codec) => codec.encode(value),
            Self::MessagePack(codec) => codec.encode(value),
        }
    }
}

impl<V: DeserializeOwned> Decoder<V> for ConfiguredCodec {
    type Payload = Bytes;

    fn decode(&self, payload: &Bytes) -> Result<V, CodecError> {
        match self {
            Self::Json(codec) => codec.decode(payload),
            Self::MessagePack(codec) => codec.decode(payload),
        }
    }
}
