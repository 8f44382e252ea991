use crate::models::audio_block::AudioBlock;
use crate::models::profile::CompressorParams;

/// Feed-forward peak compressor with a soft knee and linked channels.
///
/// Gain reduction is smoothed with separate attack/release time constants.
/// The envelope is kept across parameter changes.
#[derive(Debug, Clone)]
pub struct Compressor {
    params: CompressorParams,
    sample_rate: f64,
    attack_coeff: f64,
    release_coeff: f64,
    // Current gain reduction in dB (<= 0).
    envelope_db: f64,
}

impl Compressor {
    pub fn new(params: CompressorParams, sample_rate: f64) -> Self {
        let mut c = Self {
            params,
            sample_rate,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope_db: 0.0,
        };
        c.update_coefficients();
        c
    }

    pub fn params(&self) -> CompressorParams {
        self.params
    }

    pub fn set_params(&mut self, params: CompressorParams) {
        if params == self.params {
            return;
        }
        self.params = params;
        self.update_coefficients();
    }

    /// Current gain reduction in dB (0 or negative).
    pub fn reduction_db(&self) -> f64 {
        self.envelope_db
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = time_coeff(self.params.attack_secs, self.sample_rate);
        self.release_coeff = time_coeff(self.params.release_secs, self.sample_rate);
    }

    /// Static curve: output level for a given input level, both in dB.
    pub fn curve_db(&self, input_db: f64) -> f64 {
        let CompressorParams {
            threshold_db,
            ratio,
            knee_db,
            ..
        } = self.params;
        let over = input_db - threshold_db;
        if knee_db > 0.0 && 2.0 * over.abs() <= knee_db {
            let x = over + knee_db / 2.0;
            input_db + (1.0 / ratio - 1.0) * x * x / (2.0 * knee_db)
        } else if over > 0.0 {
            threshold_db + over / ratio
        } else {
            input_db
        }
    }

    pub fn process(&mut self, block: &mut AudioBlock) {
        let channels = block.channel_count();
        if channels == 0 {
            return;
        }
        for i in 0..block.frames() {
            let peak = (0..channels)
                .map(|c| block.channel(c)[i].abs())
                .fold(0.0f32, f32::max) as f64;
            let level_db = if peak > 1e-9 { 20.0 * peak.log10() } else { -180.0 };
            let target = self.curve_db(level_db) - level_db;

            let coeff = if target < self.envelope_db {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope_db = coeff * self.envelope_db + (1.0 - coeff) * target;

            let gain = 10f64.powf(self.envelope_db / 20.0) as f32;
            for c in 0..channels {
                block.channel_mut(c)[i] *= gain;
            }
        }
    }
}

fn time_coeff(secs: f64, sample_rate: f64) -> f64 {
    if secs <= 0.0 {
        0.0
    } else {
        (-1.0 / (secs * sample_rate)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn balanced() -> CompressorParams {
        CompressorParams::new(-22.0, 4.0, 24.0)
    }

    #[test]
    fn below_knee_is_untouched() {
        let c = Compressor::new(balanced(), 48000.0);
        assert_relative_eq!(c.curve_db(-60.0), -60.0);
    }

    #[test]
    fn far_above_threshold_uses_ratio() {
        let c = Compressor::new(balanced(), 48000.0);
        // 40 dB over threshold -> 10 dB over after 4:1.
        assert_relative_eq!(c.curve_db(18.0), -12.0, epsilon = 1e-9);
    }

    #[test]
    fn knee_is_continuous() {
        let c = Compressor::new(balanced(), 48000.0);
        let lower = -22.0 - 12.0;
        let upper = -22.0 + 12.0;
        assert_relative_eq!(c.curve_db(lower), lower, epsilon = 1e-9);
        assert_relative_eq!(c.curve_db(upper), -22.0 + 12.0 / 4.0, epsilon = 1e-9);
    }

    #[test]
    fn hard_knee_when_knee_is_zero() {
        let c = Compressor::new(CompressorParams::new(-20.0, 2.0, 0.0), 48000.0);
        assert_relative_eq!(c.curve_db(-20.0), -20.0);
        assert_relative_eq!(c.curve_db(0.0), -10.0);
    }

    #[test]
    fn loud_signal_is_attenuated() {
        let mut c = Compressor::new(balanced(), 48000.0);
        for _ in 0..100 {
            let mut block = AudioBlock::from_channels(vec![vec![0.9; 128], vec![0.9; 128]], 128);
            c.process(&mut block);
        }
        let mut block = AudioBlock::from_channels(vec![vec![0.9; 128], vec![0.9; 128]], 128);
        c.process(&mut block);
        assert!(block.channel(0)[127] < 0.3);
        assert_eq!(block.channel(0)[127], block.channel(1)[127]);
        assert!(c.reduction_db() < -10.0);
    }

    #[test]
    fn quiet_signal_passes() {
        let mut c = Compressor::new(balanced(), 48000.0);
        let mut block = AudioBlock::from_channels(vec![vec![0.01; 128]], 128);
        c.process(&mut block);
        assert_relative_eq!(block.channel(0)[127], 0.01, epsilon = 1e-6);
    }

    #[test]
    fn retune_keeps_envelope() {
        let mut c = Compressor::new(balanced(), 48000.0);
        let mut block = AudioBlock::from_channels(vec![vec![0.9; 4800]], 4800);
        c.process(&mut block);
        let before = c.reduction_db();
        c.set_params(CompressorParams::new(-26.0, 5.0, 30.0));
        assert_eq!(c.reduction_db(), before);
        assert_eq!(c.params().ratio, 5.0);
    }
}
