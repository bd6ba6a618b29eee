//! Demo event pipeline.
//!
//! ```text
//! publish(SensorReading) ─▶ SimpleChannel<Bytes> ─▶ typed subscribers
//!                                                     │ hot reading
//!                                                     ├─▶ NotificationBus "sensor.alert"
//!                                                     └─▶ BroadcastChannel<Bytes> ─▶ async mirror
//! ```

use anyhow::{Context, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tenvis_beacon_adapters::{BroadcastChannel, Notification, NotificationBus, NotificationPayload};
use tenvis_beacon_codec::ConfiguredCodec;
use tenvis_beacon_core::{
    AggregateSubscription, AutoSubscription, CodedChannelExt, ErrorHandlers, PubChannel,
    SimpleChannel, SubChannel, Subscription,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Readings above this temperature raise an alert.
const ALERT_CELSIUS: f64 = 30.0;

/// Notification name for alerts.
const ALERT_NAME: &str = "sensor.alert";

/// A sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sequence number.
    pub seq: u64,
    /// Sensor name.
    pub sensor: String,
    /// Temperature.
    pub celsius: f64,
}

/// What one run delivered.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// Readings delivered to typed subscribers.
    pub delivered: u64,
    /// Codec failures reported by the error handlers.
    pub codec_failures: u64,
    /// Alerts posted on the notification bus.
    pub alerts: u64,
    /// Readings mirrored through the broadcast adapter.
    pub mirrored: u64,
}

fn reading(seq: u64) -> SensorReading {
    // Every fifth reading is invalid for the default JSON codec.
    let celsius = if seq % 5 == 4 {
        f64::NAN
    } else {
        20.0 + (seq % 4) as f64 * 4.5
    };
    SensorReading {
        seq,
        sensor: format!("probe-{}", seq % 3),
        celsius,
    }
}

/// Run the pipeline once.
///
/// # Errors
///
/// Returns an error if the broadcast adapter cannot be created.
pub async fn run(config: &Config) -> Result<Summary> {
    let codec = ConfiguredCodec::from_config(&config.codec);
    info!(format = ?codec.format(), "Codec selected");

    let failures = Arc::new(AtomicU64::new(0));
    let errors = {
        let failures = Arc::clone(&failures);
        ErrorHandlers::shared(move |err| {
            failures.fetch_add(1, Ordering::Relaxed);
            warn!(error = %err, kind = ?err.kind(), "Dropped message");
        })
    };

    let bytes = SimpleChannel::<Bytes>::new();
    let readings =
        bytes
            .clone()
            .coded::<SensorReading, _, _>(codec.clone(), codec.clone(), errors.clone());

    let bus = NotificationBus::new();
    let alerts = bus.channel(ALERT_NAME);

    let mirror_base = BroadcastChannel::<Bytes>::new(config.demo.broadcast_capacity)
        .context("Failed to create broadcast adapter")?;
    let mirror = Arc::new(mirror_base.coded::<SensorReading, _, _>(codec.clone(), codec, errors));

    let delivered = Arc::new(AtomicU64::new(0));
    let alert_count = Arc::new(AtomicU64::new(0));
    let (mirrored_tx, mut mirrored_rx) = mpsc::unbounded_channel();

    let mut guards: Vec<AutoSubscription> = Vec::new();

    let subscriptions = AggregateSubscription::default()
        .with({
            let delivered = Arc::clone(&delivered);
            let alerts = alerts.clone();
            let mirror = Arc::clone(&mirror);
            readings.subscribe(move |reading: &SensorReading| {
                delivered.fetch_add(1, Ordering::Relaxed);
                debug!(seq = reading.seq, sensor = %reading.sensor, "Reading delivered");

                if reading.celsius > ALERT_CELSIUS {
                    alerts.publish(
                        NotificationPayload::new()
                            .with_object(json!({ "sensor": reading.sensor }))
                            .with_info("celsius", reading.celsius),
                    );
                }
                mirror.publish(reading.clone());
            })
        })
        .with(readings.subscribe_results(|result| {
            if let Err(err) = result {
                debug!(error = %err, "Result subscriber saw a failure");
            }
        }))
        .with(mirror.subscribe(move |reading: &SensorReading| {
            let _ = mirrored_tx.send(reading.seq);
        }));

    {
        let alert_count = Arc::clone(&alert_count);
        let token = bus.add_observer(ALERT_NAME, move |notification: &Notification| {
            alert_count.fetch_add(1, Ordering::Relaxed);
            info!(
                object = ?notification.object(),
                info = ?notification.user_info(),
                "Temperature alert"
            );
        });
        debug!(observer = %token, "Alert observer registered");
    }

    readings
        .subscribe(|reading: &SensorReading| {
            debug!(seq = reading.seq, "Scoped subscriber");
        })
        .auto_cancel()
        .store_in(&mut guards);

    for seq in 0..config.demo.events {
        readings.publish(reading(seq));
    }
    // Raw producers share the byte channel with the typed layer.
    bytes.publish(Bytes::from_static(b"\x00not a reading"));

    let expected = delivered.load(Ordering::Relaxed);
    let mut mirrored = 0;
    while mirrored < expected {
        match tokio::time::timeout(Duration::from_secs(1), mirrored_rx.recv()).await {
            Ok(Some(seq)) => {
                debug!(seq, "Mirrored reading");
                mirrored += 1;
            }
            Ok(None) | Err(_) => {
                warn!(mirrored, expected, "Broadcast mirror incomplete");
                break;
            }
        }
    }

    subscriptions.cancel();
    drop(guards);
    info!(
        remaining = readings.subscriber_count(),
        "Subscriptions cancelled"
    );

    Ok(Summary {
        delivered: delivered.load(Ordering::Relaxed),
        codec_failures: failures.load(Ordering::Relaxed),
        alerts: alert_count.load(Ordering::Relaxed),
        mirrored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DemoConfig, LoggingConfig};
    use tenvis_beacon_codec::{CodecConfig, Format};

    fn config(format: Format, events: u64) -> Config {
        Config {
            logging: LoggingConfig::default(),
            codec: CodecConfig {
                format,
                ..CodecConfig::default()
            },
            demo: DemoConfig {
                events,
                broadcast_capacity: 64,
            },
        }
    }

    #[test]
    fn test_reading_pattern() {
        assert!(reading(4).celsius.is_nan());
        assert_eq!(reading(3).celsius, 33.5);
        assert_eq!(reading(7).sensor, "probe-1");
    }

    #[tokio::test]
    async fn test_run_with_json() {
        let summary = run(&config(Format::Json, 10)).await.unwrap();

        // Seq 4 and 9 are NaN, plus one malformed raw payload.
        assert_eq!(summary.delivered, 8);
        assert_eq!(summary.codec_failures, 3);
        assert_eq!(summary.mirrored, 8);
        // Seq 3 and 7 are hot.
        assert_eq!(summary.alerts, 2);
    }

    #[tokio::test]
    async fn test_run_with_msgpack() {
        let summary = run(&config(Format::MessagePack, 5)).await.unwrap();

        // MessagePack carries NaN; only the raw payload fails.
        assert_eq!(summary.delivered, 5);
        assert_eq!(summary.codec_failures, 1);
        assert_eq!(summary.mirrored, 5);
    }
}
