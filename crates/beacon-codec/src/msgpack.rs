//! MessagePack codec.
//!
//! Values are written with named fields so payloads stay readable by
//! decoders that do not share the exact struct layout.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{check_payload_size, CodecError, CodecErrorKind, Decoder, Encoder};
use crate::MAX_PAYLOAD_SIZE;

/// MessagePack codec over [`Bytes`] payloads.
#[derive(Debug, Clone)]
pub struct MessagePackCodec {
    max_payload_size: usize,
}

impl MessagePackCodec {
    /// Create a new codec instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum payload size in bytes.
    #[must_use]
    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.max_payload_size = max;
        self
    }

    /// Get the maximum payload size in bytes.
    #[must_use]
    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

impl Default for MessagePackCodec {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }
}

impl<V: Serialize + ?Sized> Encoder<V> for MessagePackCodec {
    type Payload = Bytes;

    fn encode(&self, value: &V) -> Result<Bytes, CodecError> {
        let payload = rmp_serde::to_vec_named(value).map_err(CodecError::encode)?;
        check_payload_size(payload.len(), self.max_payload_size, CodecErrorKind::Encoding)?;
        Ok(Bytes::from(payload))
    }
}

impl<V: DeserializeOwned> Decoder<V> for MessagePackCodec {
    type Payload = Bytes;

    fn decode(&self, payload: &Bytes) -> Result<V, CodecError> {
        check_payload_size(payload.len(), self.max_payload_size, CodecErrorKind::Decoding)?;
        rmp_serde::from_slice(payload).map_err(CodecError::decode)
    }
}
