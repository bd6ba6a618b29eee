//! Serializing channel decorator.
//!
//! [`SerializingChannel`] turns a channel of opaque payloads into a channel of
//! typed values:
//!
//! ```text
//!   publish(V) ──encode──▶ base.publish(P)
//!                              │
//!   base subscriber (one) ◀────┘
//!        │ decode once
//!        ▼
//!   internal SimpleChannel<Result<V, CodecError>> ──▶ typed subscribers
//! ```
//!
//! Codec failures never escape `publish` or the base channel's delivery. They
//! are reported to the optional [`ErrorHandlers`] and the message is dropped.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tenvis_beacon_codec::{CodecError, Decoder, Encoder, JsonCodec, MessagePackCodec};
use tracing::trace;

use crate::channel::{AnyPubChannel, Channel, Handler, PubChannel, SubChannel};
use crate::simple::{SimpleChannel, SimpleSubscription};
use crate::subscription::{AutoSubscription, Subscription};

/// Callback for codec failures.
pub type ErrorHandler = Arc<dyn Fn(&CodecError) + Send + Sync>;

/// Outcome of decoding one payload.
pub type Decoded<V> = Result<V, CodecError>;

/// Subscription returned by [`SerializingChannel`].
pub type SerializingSubscription<V> = SimpleSubscription<Decoded<V>>;

/// JSON over a byte channel.
pub type JsonChannel<V> = SerializingChannel<V, Bytes, JsonCodec, JsonCodec>;

/// MessagePack over a byte channel.
pub type MessagePackChannel<V> = SerializingChannel<V, Bytes, MessagePackCodec, MessagePackCodec>;

/// Optional sinks for encoding and decoding failures.
#[derive(Clone, Default)]
pub struct ErrorHandlers {
    encoding: Option<ErrorHandler>,
    decoding: Option<ErrorHandler>,
}

impl ErrorHandlers {
    /// Drop failures silently.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Route both encoding and decoding failures to one handler.
    #[must_use]
    pub fn shared<F>(handler: F) -> Self
    where
        F: Fn(&CodecError) + Send + Sync + 'static,
    {
        let handler: ErrorHandler = Arc::new(handler);
        Self {
            encoding: Some(Arc::clone(&handler)),
            decoding: Some(handler),
        }
    }

    /// Set the encoding failure handler.
    #[must_use]
    pub fn on_encoding<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CodecError) + Send + Sync + 'static,
    {
        self.encoding = Some(Arc::new(handler));
        self
    }

    /// Set the decoding failure handler.
    #[must_use]
    pub fn on_decoding<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CodecError) + Send + Sync + 'static,
    {
        self.decoding = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for ErrorHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlers")
            .field("encoding", &self.encoding.is_some())
            .field("decoding", &self.decoding.is_some())
            .finish()
    }
}

/// A typed channel layered over a payload channel and a codec.
///
/// The base channel may keep other direct subscribers; they are unaffected.
/// Dropping this channel detaches it from the base.
pub struct SerializingChannel<V, P, E, D> {
    base: AnyPubChannel<P>,
    encoder: E,
    decoder: Arc<D>,
    encoding_errors: Option<ErrorHandler>,
    output: SimpleChannel<Decoded<V>>,
    _upstream: AutoSubscription,
}

impl<V, P, E, D> SerializingChannel<V, P, E, D>
where
    V: 'static,
    P: 'static,
    E: Encoder<V, Payload = P>,
    D: Decoder<V, Payload = P> + 'static,
{
    /// Layer a codec over `base`.
    ///
    /// Subscribes to `base` exactly once; every payload is decoded once no
    /// matter how many typed subscribers there are.
    pub fn new<B>(base: B, encoder: E, decoder: D, handlers: ErrorHandlers) -> Self
    where
        B: Channel<P> + Send + Sync + 'static,
    {
        let ErrorHandlers { encoding, decoding } = handlers;
        let decoder = Arc::new(decoder);
        let output = SimpleChannel::new();

        let upstream = {
            let decoder = Arc::clone(&decoder);
            let output = output.clone();
            base.subscribe(move |payload: &P| {
                let decoded = decoder.decode(payload);
                if let Err(err) = &decoded {
                    trace!(error = %err, "Dropping undecodable payload");
                    if let Some(handler) = &decoding {
                        handler(err);
                    }
                }
                output.publish(decoded);
            })
        };

        Self {
            base: base.erase_pub(),
            encoder,
            decoder,
            encoding_errors: encoding,
            output,
            _upstream: upstream.auto_cancel(),
        }
    }

    /// Register a handler that receives every decode outcome.
    ///
    /// Unlike [`SubChannel::subscribe`], failures are delivered as `Err`
    /// so the caller can branch per message.
    pub fn subscribe_results<F>(&self, handler: F) -> SerializingSubscription<V>
    where
        F: Fn(Result<&V, &CodecError>) + Send + Sync + 'static,
    {
        self.output
            .subscribe(move |decoded: &Decoded<V>| handler(decoded.as_ref()))
    }

    /// Get the encoder.
    #[must_use]
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Get the decoder.
    #[must_use]
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Get the number of typed subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.output.subscriber_count()
    }
}

impl<V, P, E, D> PubChannel<V> for SerializingChannel<V, P, E, D>
where
    E: Encoder<V, Payload = P>,
{
    fn publish(&self, value: V) {
        match self.encoder.encode(&value) {
            Ok(payload) => self.base.publish(payload),
            Err(err) => {
                trace!(error = %err, "Dropping unencodable value");
                if let Some(handler) = &self.encoding_errors {
                    handler(&err);
                }
            }
        }
    }
}

impl<V: 'static, P, E, D> SubChannel<V> for SerializingChannel<V, P, E, D> {
    type Subscription = SerializingSubscription<V>;

    fn subscribe_handler(&self, handler: Handler<V>) -> SerializingSubscription<V> {
        self.output.subscribe(move |decoded: &Decoded<V>| {
            if let Ok(value) = decoded {
                handler(value);
            }
        })
    }
}

impl<V, P, E: fmt::Debug, D: fmt::Debug> fmt::Debug for SerializingChannel<V, P, E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializingChannel")
            .field("encoder", &self.encoder)
            .field("decoder", &self.decoder)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Layer any codec over a channel.
pub trait CodedChannelExt<P>: Channel<P> + Sized + Send + Sync + 'static {
    /// Wrap this channel with `encoder` and `decoder`.
    fn coded<V, E, D>(
        self,
        encoder: E,
        decoder: D,
        handlers: ErrorHandlers,
    ) -> SerializingChannel<V, P, E, D>
    where
        V: 'static,
        P: 'static,
        E: Encoder<V, Payload = P>,
        D: Decoder<V, Payload = P> + 'static,
    {
        SerializingChannel::new(self, encoder, decoder, handlers)
    }
}

impl<P, C> CodedChannelExt<P> for C where C: Channel<P> + Send + Sync + 'static {}

/// Convenience codecs for byte channels.
pub trait ByteChannelExt: Channel<Bytes> + Sized + Send + Sync + 'static {
    /// Carry `V` as JSON text.
    fn json_coded<V>(self, handlers: ErrorHandlers) -> JsonChannel<V>
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        let codec = JsonCodec::new();
        SerializingChannel::new(self, codec.clone(), codec, handlers)
    }

    /// Carry `V` as MessagePack.
    fn msgpack_coded<V>(self, handlers: ErrorHandlers) -> MessagePackChannel<V>
    where
        V: Serialize + DeserializeOwned + 'static,
    {
        let codec = MessagePackCodec::new();
        SerializingChannel::new(self, codec.clone(), codec, handlers)
    }
}

impl<C> ByteChannelExt for C where C: Channel<Bytes> + Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tenvis_beacon_codec::CodecErrorKind;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        seq: u32,
        ratio: f64,
    }

    fn errors() -> (Arc<Mutex<Vec<CodecErrorKind>>>, ErrorHandlers) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handlers = ErrorHandlers::shared(move |err: &CodecError| sink.lock().push(err.kind()));
        (seen, handlers)
    }

    #[test]
    fn test_decode_once_for_many_subscribers() {
        struct CountingDecoder {
            calls: Arc<AtomicUsize>,
        }

        impl Decoder<Ping> for CountingDecoder {
            type Payload = Bytes;

            fn decode(&self, payload: &Bytes) -> Result<Ping, CodecError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                JsonCodec::new().decode(payload)
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let base = SimpleChannel::<Bytes>::new();
        let channel = base.clone().coded(
            JsonCodec::new(),
            CountingDecoder {
                calls: Arc::clone(&calls),
            },
            ErrorHandlers::none(),
        );

        let received = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let received = Arc::clone(&received);
            let _ = channel.subscribe(move |_: &Ping| {
                received.fetch_add(1, Ordering::SeqCst);
            });
        }

        channel.publish(Ping { seq: 1, ratio: 0.5 });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(received.load(Ordering::SeqCst), 5);
        assert_eq!(channel.subscriber_count(), 5);
    }

    #[test]
    fn test_result_subscribers_see_failures() {
        let base = SimpleChannel::<Bytes>::new();
        let (seen, handlers) = errors();
        let channel = base.clone().json_coded::<Ping>(handlers);

        let values = Arc::new(Mutex::new(Vec::new()));
        let outcomes = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&values);
        let _values = channel.subscribe(move |ping: &Ping| sink.lock().push(ping.seq));
        let sink = Arc::clone(&outcomes);
        let _outcomes = channel.subscribe_results(move |result: Result<&Ping, &CodecError>| {
            sink.lock().push(result.map(|p| p.seq).map_err(CodecError::kind));
        });

        channel.publish(Ping { seq: 7, ratio: 1.0 });
        base.publish(Bytes::from_static(b"not json"));

        assert_eq!(*values.lock(), vec![7]);
        assert_eq!(
            *outcomes.lock(),
            vec![Ok(7), Err(CodecErrorKind::Decoding)]
        );
        assert_eq!(*seen.lock(), vec![CodecErrorKind::Decoding]);
    }

    #[test]
    fn test_encoding_failure_publishes_nothing() {
        let base = SimpleChannel::<Bytes>::new();
        let raw = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&raw);
        let _raw = base.subscribe(move |_: &Bytes| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let encode_errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&encode_errors);
        let channel = base.clone().json_coded::<Ping>(ErrorHandlers::none().on_encoding(
            move |err: &CodecError| {
                assert!(err.is_encoding());
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));

        channel.publish(Ping {
            seq: 1,
            ratio: f64::NAN,
        });

        assert_eq!(raw.load(Ordering::SeqCst), 0);
        assert_eq!(encode_errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_errors_without_handlers_are_silent() {
        let base = SimpleChannel::<Bytes>::new();
        let channel = base.clone().json_coded::<Ping>(ErrorHandlers::none());
        let received = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&received);
        let _subscription = channel.subscribe(move |_: &Ping| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        channel.publish(Ping {
            seq: 1,
            ratio: f64::INFINITY,
        });
        base.publish(Bytes::from_static(b"{"));

        assert_eq!(received.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_detaches_from_base() {
        let base = SimpleChannel::<Bytes>::new();
        let channel = base.clone().json_coded::<Ping>(ErrorHandlers::none());
        assert_eq!(base.subscriber_count(), 1);

        drop(channel);
        assert!(base.is_empty());
    }

    #[test]
    fn test_msgpack_channel_roundtrip() {
        let base = SimpleChannel::<Bytes>::new();
        let channel = base.clone().msgpack_coded::<Ping>(ErrorHandlers::none());
        let received = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&received);
        let _subscription = channel.subscribe(move |ping: &Ping| *sink.lock() = Some(ping.clone()));

        // MessagePack keeps non-finite floats.
        let ping = Ping {
            seq: 3,
            ratio: f64::INFINITY,
        };
        channel.publish(ping.clone());

        assert_eq!(*received.lock(), Some(ping));
    }

    #[test]
    fn test_serializing_channel_erases() {
        let base = SimpleChannel::<Bytes>::new();
        let channel = base.clone().json_coded::<Ping>(ErrorHandlers::none()).erase();
        let received = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&received);
        let subscription = channel.subscribe(move |_: &Ping| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        channel.publish(Ping { seq: 1, ratio: 2.0 });
        subscription.cancel();
        channel.publish(Ping { seq: 2, ratio: 2.0 });

        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stacked_serializing_channels() {
        // u32 as decimal text, layered over a MessagePack channel of strings.
        let base = SimpleChannel::<Bytes>::new();
        let outer = base.clone().msgpack_coded::<String>(ErrorHandlers::none());
        let inner: SerializingChannel<u32, String, _, _> = outer.coded(
            StringCodec,
            StringCodec,
            ErrorHandlers::none(),
        );

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let _subscription = inner.subscribe(move |value: &u32| sink.lock().push(*value));

        inner.publish(42);
        assert_eq!(*received.lock(), vec![42]);
    }

    struct StringCodec;

    impl Encoder<u32> for StringCodec {
        type Payload = String;

        fn encode(&self, value: &u32) -> Result<String, CodecError> {
            Ok(value.to_string())
        }
    }

    impl Decoder<u32> for StringCodec {
        type Payload = String;

        fn decode(&self, payload: &String) -> Result<u32, CodecError> {
            payload.parse().map_err(CodecError::decode)
        }
    }
}
