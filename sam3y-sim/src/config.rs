//! Optional JSON config for the simulator binary.
//!
//! Every field is optional; anything missing falls back to the coordinator
//! defaults. Keys are camelCase:
//!
//! ```json
//! { "hostTimeoutMs": 5000, "sampleRate": 48000, "blockFrames": 128 }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sam3y_core::models::config::{CoordinatorConfig, RenderConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimConfig {
    #[serde(default)]
    pub host_timeout_ms: Option<u64>,
    #[serde(default)]
    pub sample_rate: Option<f64>,
    #[serde(default)]
    pub block_frames: Option<usize>,
    #[serde(default)]
    pub channels: Option<u16>,
    #[serde(default)]
    pub destination_secs: Option<f64>,
    #[serde(default)]
    pub render_interval_ms: Option<u64>,
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Overlay onto the defaults and validate the result.
    pub fn coordinator_config(&self) -> Result<CoordinatorConfig, ConfigError> {
        let defaults = CoordinatorConfig::default();
        let render = RenderConfig {
            sample_rate: self.sample_rate.unwrap_or(defaults.render.sample_rate),
            block_frames: self.block_frames.unwrap_or(defaults.render.block_frames),
            channels: self.channels.unwrap_or(defaults.render.channels),
            destination_secs: self
                .destination_secs
                .unwrap_or(defaults.render.destination_secs),
            render_interval: self
                .render_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.render.render_interval),
        };
        let config = CoordinatorConfig {
            host_timeout: self
                .host_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.host_timeout),
            render,
        };
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_defaults() {
        let config: SimConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.coordinator_config().unwrap(), CoordinatorConfig::default());
    }

    #[test]
    fn overrides_apply() {
        let config: SimConfig =
            serde_json::from_str(r#"{"hostTimeoutMs": 250, "channels": 1, "renderIntervalMs": 5}"#).unwrap();
        let c = config.coordinator_config().unwrap();
        assert_eq!(c.host_timeout, Duration::from_millis(250));
        assert_eq!(c.render.channels, 1);
        assert_eq!(c.render.render_interval, Duration::from_millis(5));
        assert_eq!(c.render.sample_rate, 48000.0);
    }

    #[test]
    fn invalid_values_rejected() {
        let config = SimConfig {
            host_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.coordinator_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_reports_missing_and_bad_files() {
        let dir = std::env::temp_dir().join(format!("sam3y-sim-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = SimConfig::load(&dir.join("nope.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let bad = dir.join("bad.json");
        std::fs::write(&bad, "{ sampleRate: ").unwrap();
        assert!(matches!(SimConfig::load(&bad), Err(ConfigError::Parse { .. })));

        let good = dir.join("good.json");
        std::fs::write(&good, r#"{"blockFrames": 256}"#).unwrap();
        assert_eq!(SimConfig::load(&good).unwrap().block_frames, Some(256));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
