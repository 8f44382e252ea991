use std::time::Duration;

use super::audio_block::BlockFormat;

/// Shared rendering context settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Context sample rate in Hz (default: 48000).
    pub sample_rate: f64,

    /// Frames per render quantum (default: 128).
    pub block_frames: usize,

    /// Output channels (default: 2).
    pub channels: u16,

    /// Seconds of rendered output retained at the destination (default: 2.0).
    pub destination_secs: f64,

    /// How often the render thread wakes to catch up on due quanta (default: 10 ms).
    pub render_interval: Duration,
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate <= 0.0 {
            return Err("sample rate must be positive".into());
        }
        if self.block_frames == 0 {
            return Err("block size must be at least one frame".into());
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.destination_secs <= 0.0 {
            return Err("destination buffer must hold some audio".into());
        }
        if self.render_interval.is_zero() {
            return Err("render interval must be non-zero".into());
        }
        Ok(())
    }

    pub fn block_format(&self) -> BlockFormat {
        BlockFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            frames: self.block_frames,
        }
    }

    pub fn destination_frames(&self) -> usize {
        ((self.sample_rate * self.destination_secs) as usize).max(self.block_frames)
    }

    pub fn quantum_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_frames as f64 / self.sample_rate)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_frames: 128,
            channels: 2,
            destination_secs: 2.0,
            render_interval: Duration::from_millis(10),
        }
    }
}

/// Kind of media a capture handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource {
    Tab,
}

/// Constraints applied when turning a capture handle into a live stream.
///
/// Tab audio is taken raw: every voice-call style processing step is off.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConstraints {
    pub source: MediaSource,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub sample_rate: f64,
    pub channels: u16,
}

impl CaptureConstraints {
    pub fn for_render(config: &RenderConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            ..Self::default()
        }
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            source: MediaSource::Tab,
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
            sample_rate: 48000.0,
            channels: 2,
        }
    }
}

/// Settings for the session coordinator and the host it launches.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Upper bound on every coordinator → host request (default: 5 s).
    pub host_timeout: Duration,

    pub render: RenderConfig,
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.host_timeout.is_zero() {
            return Err("host timeout must be non-zero".into());
        }
        self.render.validate()
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            host_timeout: Duration::from_secs(5),
            render: RenderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RenderConfig::default().validate().is_ok());
        assert!(CoordinatorConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_render_settings() {
        let bad_rate = RenderConfig {
            sample_rate: 0.0,
            ..Default::default()
        };
        assert!(bad_rate.validate().is_err());

        let bad_channels = RenderConfig {
            channels: 6,
            ..Default::default()
        };
        assert!(bad_channels.validate().unwrap_err().contains("channel"));

        let bad_timeout = CoordinatorConfig {
            host_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(bad_timeout.validate().is_err());
    }

    #[test]
    fn derived_sizes() {
        let config = RenderConfig::default();
        assert_eq!(config.destination_frames(), 96000);
        assert_eq!(config.block_format().frames, 128);
        let q = config.quantum_duration().as_secs_f64();
        assert!((q - 128.0 / 48000.0).abs() < 1e-9);
    }

    #[test]
    fn constraints_disable_voice_processing() {
        let c = CaptureConstraints::for_render(&RenderConfig::default());
        assert_eq!(c.source, MediaSource::Tab);
        assert!(!c.echo_cancellation && !c.noise_suppression && !c.auto_gain_control);
        assert_eq!(c.channels, 2);
    }
}
