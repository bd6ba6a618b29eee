//! Demo configuration.
//!
//! Loaded from the first existing file among `beacon.toml`,
//! `/etc/beacon/beacon.toml` and `~/.config/beacon/beacon.toml`, falling
//! back to defaults with environment overrides (`BEACON_*`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tenvis_beacon_codec::CodecConfig;

/// Demo configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Codec used by the typed channels.
    #[serde(default)]
    pub codec: CodecConfig,

    /// What the demo publishes.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

/// Demo workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Number of events to publish.
    #[serde(default = "default_events")]
    pub events: u64,

    /// Capacity of the broadcast adapter.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

// Default value functions
fn default_filter() -> String {
    std::env::var("BEACON_LOG").unwrap_or_else(|_| "beacon=info,tenvis_beacon=debug".to_string())
}

fn default_events() -> u64 {
    std::env::var("BEACON_EVENTS")
        .ok()
        .and_then(|n| n.parse().ok())
        .unwrap_or(5)
}

fn default_broadcast_capacity() -> usize {
    tenvis_beacon_adapters::DEFAULT_CAPACITY
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            events: default_events(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, the default locations, or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(shellexpand::tilde(path).as_ref());
        }

        let config_paths = [
            "beacon.toml",
            "/etc/beacon/beacon.toml",
            "~/.config/beacon/beacon.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}
