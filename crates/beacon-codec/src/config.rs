//! Codec configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (BEACON_*)
//! - A TOML document or file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::json::NonFiniteFloats;
use crate::MAX_PAYLOAD_SIZE;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Unknown payload format name.
    #[error("Unknown codec format: {0}")]
    UnknownFormat(String),
}

/// Payload format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON text.
    #[default]
    Json,
    /// MessagePack.
    #[serde(rename = "msgpack", alias = "messagepack")]
    MessagePack,
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "msgpack" | "messagepack" => Ok(Self::MessagePack),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

/// Codec configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Payload format.
    #[serde(default = "default_format")]
    pub format: Format,

    /// Pretty-print JSON payloads.
    #[serde(default)]
    pub pretty: bool,

    /// Policy for `NaN` and infinite floats (JSON only).
    #[serde(default)]
    pub non_finite_floats: NonFiniteFloats,

    /// Maximum payload size in bytes.
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: usize,
}

// Default value functions
fn default_format() -> Format {
    std::env::var("BEACON_CODEC_FORMAT")
        .ok()
        .and_then(|f| f.parse().ok())
        .unwrap_or_default()
}

fn default_max_payload_size() -> usize {
    std::env::var("BEACON_MAX_PAYLOAD_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(MAX_PAYLOAD_SIZE)
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            pretty: false,
            non_finite_floats: NonFiniteFloats::default(),
            max_payload_size: default_max_payload_size(),
        }
    }
}

impl CodecConfig {
    /// Parse configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML for this type.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("MsgPack".parse::<Format>().unwrap(), Format::MessagePack);
        assert!(matches!(
            "yaml".parse::<Format>(),
            Err(ConfigError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            format = "msgpack"
            max_payload_size = 1024
        "#;

        let config = CodecConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.format, Format::MessagePack);
        assert_eq!(config.max_payload_size, 1024);
        assert!(!config.pretty);
        assert_eq!(config.non_finite_floats, NonFiniteFloats::Reject);
    }

    #[test]
    fn test_config_json_options() {
        let toml_str = r#"
            format = "json"
            pretty = true
            non_finite_floats = "null"
        "#;

        let config = CodecConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.format, Format::Json);
        assert!(config.pretty);
        assert_eq!(config.non_finite_floats, NonFiniteFloats::Null);
    }

    #[test]
    fn test_config_invalid_toml() {
        let result = CodecConfig::from_toml_str("format = 42");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_missing_file() {
        let result = CodecConfig::from_file("/nonexistent/beacon.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
