//! # Beacon Demo
//!
//! Wires typed channels, a runtime-selected codec and both adapters together,
//! then publishes a short burst of sensor readings.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! beacon-demo
//!
//! # Run with custom config
//! beacon-demo /path/to/beacon.toml
//!
//! # Run with environment variables
//! BEACON_CODEC_FORMAT=msgpack BEACON_EVENTS=20 beacon-demo
//! ```

mod config;
mod pipeline;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let config = config::Config::load(config_path.as_deref())?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        format = ?config.codec.format,
        events = config.demo.events,
        "Starting Beacon demo"
    );

    let summary = pipeline::run(&config).await?;
    tracing::info!(
        delivered = summary.delivered,
        codec_failures = summary.codec_failures,
        alerts = summary.alerts,
        mirrored = summary.mirrored,
        "Beacon demo finished"
    );

    Ok(())
}
