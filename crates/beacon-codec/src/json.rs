//! JSON codec.
//!
//! `serde_json` silently writes non-finite floats as `null`, which does not
//! survive a round trip. By default [`JsonCodec`] walks the value first and
//! rejects `NaN` and infinities with an encoding error.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{ser, Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

use crate::codec::{check_payload_size, CodecError, CodecErrorKind, Decoder, Encoder};
use crate::MAX_PAYLOAD_SIZE;

/// How the JSON codec treats `NaN` and infinite floats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonFiniteFloats {
    /// Fail with an encoding error.
    #[default]
    Reject,
    /// Write `null`, as `serde_json` does.
    Null,
}

/// JSON text codec over [`Bytes`] payloads.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    pretty: bool,
    non_finite_floats: NonFiniteFloats,
    max_payload_size: usize,
}

impl JsonCodec {
    /// Create a compact JSON codec that rejects non-finite floats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable pretty printing.
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Set the non-finite float policy.
    #[must_use]
    pub fn with_non_finite_floats(mut self, policy: NonFiniteFloats) -> Self {
        self.non_finite_floats = policy;
        self
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

impl Default for JsonCodec {
    fn default() -> Self {
        Self {
            pretty: false,
            non_finite_floats: NonFiniteFloats::Reject,
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }
}

impl<V: Serialize + ?Sized> Encoder<V> for JsonCodec {
    type Payload = Bytes;

    fn encode(&self, value: &V) -> Result<Bytes, CodecError> {
        if self.non_finite_floats == NonFiniteFloats::Reject {
            value.serialize(FiniteFloats).map_err(CodecError::encode)?;
        }

        let payload = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
        .map_err(CodecError::encode)?;

        check_payload_size(payload.len(), self.max_payload_size, CodecErrorKind::Encoding)?;
        Ok(Bytes::from(payload))
    }
}

impl<V: DeserializeOwned> Decoder<V> for JsonCodec {
    type Payload = Bytes;

    fn decode(&self, payload: &Bytes) -> Result<V, CodecError> {
        check_payload_size(payload.len(), self.max_payload_size, CodecErrorKind::Decoding)?;
        serde_json::from_slice(payload).map_err(CodecError::decode)
    }
}

/// Error raised by the float validation pass.
#[derive(Debug, Error)]
pub enum FloatCheckError {
    /// A `NaN` or infinite value was found.
    #[error("non-finite float {0} is not representable in JSON")]
    NonFinite(f64),

    /// The value's own `Serialize` impl failed.
    #[error("{0}")]
    Custom(String),
}

impl ser::Error for FloatCheckError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

/// Serializer that produces nothing and fails on the first non-finite float.
#[derive(Clone, Copy)]
struct FiniteFloats;

type CheckResult = Result<(), FloatCheckError>;

fn check_float(value: f64) -> CheckResult {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FloatCheckError::NonFinite(value))
    }
}

macro_rules! accept {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, _value: $ty) -> CheckResult {
                Ok(())
            }
        )*
    };
}

impl ser::Serializer for FiniteFloats {
    type Ok = ();
    type Error = FloatCheckError;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    accept! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
        serialize_unit_struct: &'static str,
    }

    fn serialize_f32(self, value: f32) -> CheckResult {
        check_float(f64::from(value))
    }

    fn serialize_f64(self, value: f64) -> CheckResult {
        check_float(value)
    }

    fn serialize_none(self) -> CheckResult {
        Ok(())
    }

    fn serialize_some<T>(self, value: &T) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> CheckResult {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> CheckResult {
        Ok(())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, FloatCheckError> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, FloatCheckError> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self, FloatCheckError> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, FloatCheckError> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, FloatCheckError> {
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, FloatCheckError> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, FloatCheckError> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteFloats {
    type Ok = ();
    type Error = FloatCheckError;

    fn serialize_element<T>(&mut self, value: &T) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        value.serialize(*self)
    }

    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteFloats {
    type Ok = ();
    type Error = FloatCheckError;

    fn serialize_element<T>(&mut self, value: &T) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        value.serialize(*self)
    }

    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteFloats {
    type Ok = ();
    type Error = FloatCheckError;

    fn serialize_field<T>(&mut self, value: &T) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        value.serialize(*self)
    }

    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteFloats {
    type Ok = ();
    type Error = FloatCheckError;

    fn serialize_field<T>(&mut self, value: &T) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        value.serialize(*self)
    }

    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteFloats {
    type Ok = ();
    type Error = FloatCheckError;

    fn serialize_key<T>(&mut self, key: &T) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        key.serialize(*self)
    }

    fn serialize_value<T>(&mut self, value: &T) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        value.serialize(*self)
    }

    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteFloats {
    type Ok = ();
    type Error = FloatCheckError;

    fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        value.serialize(*self)
    }

    fn end(self) -> CheckResult {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteFloats {
    type Ok = ();
    type Error = FloatCheckError;

    fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> CheckResult
    where
        T: ?Sized + Serialize,
    {
        value.serialize(*self)
    }

    fn end(self) -> CheckResult {
        Ok(())
    }
}
