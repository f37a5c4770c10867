// src/config.rs
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::SweepConfig;

/// Serial link parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub baud_rate: u32,
    /// Upper bound on every blocking read from the instrument.
    pub read_timeout_ms: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout_ms: 2000,
        }
    }
}

impl ChannelSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }
}

/// Everything the command line tool needs besides the port name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub channel: ChannelSettings,
    pub sweep: SweepConfig,
}

impl AppConfig {
    /// Loads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = AppConfig::from_json("{}").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.sweep.start_frequency, 1000);
        assert_eq!(cfg.sweep.frequency_increment, 10_000);
        assert_eq!(cfg.sweep.num_points, 100);
        assert_eq!(cfg.channel.read_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = AppConfig::from_json(
            r#"{"channel":{"read_timeout_ms":500},"sweep":{"num_points":3,"reference_resistance":220.0}}"#,
        )
        .unwrap();
        assert_eq!(cfg.channel.baud_rate, 115_200);
        assert_eq!(cfg.channel.read_timeout_ms, 500);
        assert_eq!(cfg.sweep.num_points, 3);
        assert_eq!(cfg.sweep.start_frequency, 1000);
        assert_eq!(cfg.sweep.reference_resistance, 220.0);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(AppConfig::from_json("{\"sweep\":").is_err());
        assert!(AppConfig::from_json(r#"{"sweep":{"num_points":-1}}"#).is_err());
    }
}
