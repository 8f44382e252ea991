use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Processing profile: how aggressively the filter chain isolates voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Fast,
    #[default]
    Balanced,
    Best,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Fast, Profile::Balanced, Profile::Best];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Best => "best",
        }
    }

    /// Filter-chain parameters for this profile.
    ///
    /// ```text
    /// profile   highpass   bandpass   lowpass    compressor (thr/ratio/knee)
    /// fast      200/0.6    1300/0.7   4800/0.6   -18 dB / 3.0 / 30
    /// balanced  220/0.7    1400/0.9   4200/0.7   -22 dB / 4.0 / 24
    /// best      260/0.9    1600/1.1   3800/0.9   -26 dB / 5.0 / 30
    /// ```
    ///
    /// `fast` has no knee of its own and always takes the compressor default
    /// of 30 dB, whichever profile was applied before it.
    pub fn preset(self) -> ProfilePreset {
        match self {
            Self::Fast => ProfilePreset {
                highpass: BiquadParams::new(200.0, 0.6),
                bandpass: BiquadParams::new(1300.0, 0.7),
                lowpass: BiquadParams::new(4800.0, 0.6),
                compressor: CompressorParams::new(-18.0, 3.0, CompressorParams::DEFAULT_KNEE_DB),
                output_gain: OUTPUT_GAIN,
            },
            Self::Balanced => ProfilePreset {
                highpass: BiquadParams::new(220.0, 0.7),
                bandpass: BiquadParams::new(1400.0, 0.9),
                lowpass: BiquadParams::new(4200.0, 0.7),
                compressor: CompressorParams::new(-22.0, 4.0, 24.0),
                output_gain: OUTPUT_GAIN,
            },
            Self::Best => ProfilePreset {
                highpass: BiquadParams::new(260.0, 0.9),
                bandpass: BiquadParams::new(1600.0, 1.1),
                lowpass: BiquadParams::new(3800.0, 0.9),
                compressor: CompressorParams::new(-26.0, 5.0, 30.0),
                output_gain: OUTPUT_GAIN,
            },
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "best" => Ok(Self::Best),
            other => Err(format!("unknown profile: {}", other)),
        }
    }
}

/// Post-chain makeup gain, identical across profiles.
pub const OUTPUT_GAIN: f32 = 1.1;

/// Cutoff/center frequency and Q for one biquad stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadParams {
    pub frequency_hz: f64,
    pub q: f64,
}

impl BiquadParams {
    pub const fn new(frequency_hz: f64, q: f64) -> Self {
        Self { frequency_hz, q }
    }
}

/// Dynamics compressor settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    pub threshold_db: f64,
    pub ratio: f64,
    pub knee_db: f64,
    pub attack_secs: f64,
    pub release_secs: f64,
}

impl CompressorParams {
    /// Compressor knee when a profile leaves it unset (the WebAudio default).
    pub const DEFAULT_KNEE_DB: f64 = 30.0;
    pub const ATTACK_SECS: f64 = 0.003;
    pub const RELEASE_SECS: f64 = 0.25;

    pub const fn new(threshold_db: f64, ratio: f64, knee_db: f64) -> Self {
        Self {
            threshold_db,
            ratio,
            knee_db,
            attack_secs: Self::ATTACK_SECS,
            release_secs: Self::RELEASE_SECS,
        }
    }
}

/// Every stage parameter of the processing chain for one profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePreset {
    pub highpass: BiquadParams,
    pub bandpass: BiquadParams,
    pub lowpass: BiquadParams,
    pub compressor: CompressorParams,
    pub output_gain: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_balanced() {
        assert_eq!(Profile::default(), Profile::Balanced);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Profile::Best).unwrap(), r#""best""#);
        let p: Profile = serde_json::from_str(r#""fast""#).unwrap();
        assert_eq!(p, Profile::Fast);
        assert!(serde_json::from_str::<Profile>(r#""loud""#).is_err());
    }

    #[test]
    fn presets_match_table() {
        let fast = Profile::Fast.preset();
        assert_eq!(fast.highpass, BiquadParams::new(200.0, 0.6));
        assert_eq!(fast.compressor.threshold_db, -18.0);
        assert_eq!(fast.compressor.knee_db, 30.0);

        let balanced = Profile::Balanced.preset();
        assert_eq!(balanced.bandpass, BiquadParams::new(1400.0, 0.9));
        assert_eq!(balanced.compressor.ratio, 4.0);
        assert_eq!(balanced.compressor.knee_db, 24.0);

        let best = Profile::Best.preset();
        assert_eq!(best.lowpass, BiquadParams::new(3800.0, 0.9));
        assert_eq!(best.compressor.threshold_db, -26.0);
        assert_eq!(best.compressor.ratio, 5.0);
    }

    #[test]
    fn presets_get_more_aggressive() {
        let [fast, balanced, best] = Profile::ALL.map(Profile::preset);
        assert!(fast.highpass.frequency_hz < balanced.highpass.frequency_hz);
        assert!(balanced.highpass.frequency_hz < best.highpass.frequency_hz);
        assert!(fast.lowpass.frequency_hz > best.lowpass.frequency_hz);
        assert!(fast.compressor.threshold_db > best.compressor.threshold_db);
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("balanced".parse::<Profile>(), Ok(Profile::Balanced));
        assert!("BEST".parse::<Profile>().is_err());
    }
}
