//! Broadcaster configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (SPIKECAST_*)
//! - TOML configuration file
//!
//! The host application owns persistence: it loads a config at startup,
//! hands it to [`Broadcaster::with_config`], and writes the applied
//! port/format back out however it stores settings.
//!
//! [`Broadcaster::with_config`]: crate::Broadcaster::with_config

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spikecast_core::OutputFormat;
use std::path::Path;

use crate::broadcaster::DEFAULT_PORT;

/// Broadcaster configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Port to listen on; 0 requests an OS-assigned ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Output format for events.
    #[serde(default)]
    pub format: OutputFormat,

    /// Search upward for a free port when the configured one is occupied.
    #[serde(default = "default_true")]
    pub search_for_port: bool,
}

// Default value functions
fn default_port() -> u16 {
    std::env::var("SPIKECAST_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn default_true() -> bool {
    true
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            format: OutputFormat::default(),
            search_for_port: true,
        }
    }
}

impl BroadcastConfig {
    /// Load configuration from the first config file found, or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "spikecast.toml",
            "/etc/spikecast/spikecast.toml",
            "~/.config/spikecast/spikecast.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
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

        let config: BroadcastConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BroadcastConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.search_for_port);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            port = 6000
            format = "raw_binary"
        "#;

        let config: BroadcastConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.format, OutputFormat::RawBinary);
        assert!(config.search_for_port);
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = BroadcastConfig {
            port: 5558,
            format: OutputFormat::RawBinary,
            search_for_port: false,
        };
        let rendered = toml::to_string(&config).unwrap();
        let parsed: BroadcastConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.port, 5558);
        assert_eq!(parsed.format, OutputFormat::RawBinary);
        assert!(!parsed.search_for_port);
    }

    #[test]
    fn test_format_ordinals_for_hosts() {
        // Hosts that persist the format as an integer id round-trip it
        // through the ordinal mapping.
        assert_eq!(
            OutputFormat::from_ordinal(OutputFormat::RawBinary.ordinal()),
            Some(OutputFormat::RawBinary)
        );
    }
}
