use std::f64::consts::PI;

use crate::models::audio_block::AudioBlock;
use crate::models::profile::BiquadParams;

/// Biquad response type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Highpass,
    Bandpass,
    Lowpass,
}

/// Multichannel biquad filter, Direct Form II Transposed.
///
/// Coefficients follow the Web Audio `BiquadFilterNode` definitions:
/// for high/low-pass `q` is a resonance in dB, for band-pass it is linear
/// (constant 0 dB peak gain). Per-channel state survives parameter changes,
/// so retuning a running filter never clicks.
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    params: BiquadParams,
    sample_rate: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    // [z1, z2] per channel
    state: Vec<[f64; 2]>,
}

impl Biquad {
    pub fn new(kind: FilterKind, params: BiquadParams, sample_rate: f64, channels: usize) -> Self {
        let mut filter = Self {
            kind,
            params,
            sample_rate,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            state: vec![[0.0; 2]; channels],
        };
        filter.update_coefficients();
        filter
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn params(&self) -> BiquadParams {
        self.params
    }

    /// Retune in place. No-op when nothing changed.
    pub fn set_params(&mut self, params: BiquadParams) {
        if params == self.params {
            return;
        }
        self.params = params;
        self.update_coefficients();
    }

    pub fn reset(&mut self) {
        for s in &mut self.state {
            *s = [0.0; 2];
        }
    }

    fn update_coefficients(&mut self) {
        let nyquist = self.sample_rate / 2.0;
        let freq = self.params.frequency_hz.clamp(1.0, nyquist * 0.999);
        let w0 = 2.0 * PI * freq / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();

        let (b0, b1, b2, a0, a1, a2) = match self.kind {
            FilterKind::Lowpass => {
                let alpha = sin_w0 / (2.0 * db_to_linear_q(self.params.q));
                (
                    (1.0 - cos_w0) / 2.0,
                    1.0 - cos_w0,
                    (1.0 - cos_w0) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            FilterKind::Highpass => {
                let alpha = sin_w0 / (2.0 * db_to_linear_q(self.params.q));
                (
                    (1.0 + cos_w0) / 2.0,
                    -(1.0 + cos_w0),
                    (1.0 + cos_w0) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            FilterKind::Bandpass => {
                let q = self.params.q.max(1e-4);
                let alpha = sin_w0 / (2.0 * q);
                (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    /// Filter every channel of `block` in place.
    pub fn process(&mut self, block: &mut AudioBlock) {
        if self.state.len() < block.channel_count() {
            self.state.resize(block.channel_count(), [0.0; 2]);
        }
        let (b0, b1, b2, a1, a2) = (self.b0, self.b1, self.b2, self.a1, self.a2);
        for (ch, samples) in block.channels_mut().enumerate() {
            let [mut z1, mut z2] = self.state[ch];
            for s in samples.iter_mut() {
                let x = *s as f64;
                let y = b0 * x + z1;
                z1 = b1 * x - a1 * y + z2;
                z2 = b2 * x - a2 * y;
                *s = y as f32;
            }
            self.state[ch] = [flush_denormal(z1), flush_denormal(z2)];
        }
    }

    /// Magnitude response at `freq_hz`.
    pub fn magnitude_at(&self, freq_hz: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / self.sample_rate;
        let (sin1, cos1) = w.sin_cos();
        let (sin2, cos2) = (2.0 * w).sin_cos();
        let num_re = self.b0 + self.b1 * cos1 + self.b2 * cos2;
        let num_im = -(self.b1 * sin1 + self.b2 * sin2);
        let den_re = 1.0 + self.a1 * cos1 + self.a2 * cos2;
        let den_im = -(self.a1 * sin1 + self.a2 * sin2);
        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

fn db_to_linear_q(q_db: f64) -> f64 {
    10f64.powf(q_db / 20.0)
}

#[inline]
fn flush_denormal(x: f64) -> f64 {
    if x.abs() < 1e-30 {
        0.0
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FS: f64 = 48000.0;

    #[test]
    fn lowpass_passes_dc_and_rejects_nyquist() {
        let lp = Biquad::new(FilterKind::Lowpass, BiquadParams::new(4200.0, 0.7), FS, 2);
        assert_relative_eq!(lp.magnitude_at(0.0), 1.0, epsilon = 1e-9);
        assert!(lp.magnitude_at(23_000.0) < 0.01);
    }

    #[test]
    fn highpass_rejects_dc() {
        let hp = Biquad::new(FilterKind::Highpass, BiquadParams::new(220.0, 0.7), FS, 2);
        assert!(hp.magnitude_at(0.0) < 1e-9);
        assert_relative_eq!(hp.magnitude_at(10_000.0), 1.0, epsilon = 1e-2);
    }

    #[test]
    fn resonance_q_is_in_decibels() {
        // At the cutoff an RBJ low-pass has gain equal to its linear Q.
        let lp = Biquad::new(FilterKind::Lowpass, BiquadParams::new(4200.0, 6.0), FS, 1);
        assert_relative_eq!(lp.magnitude_at(4200.0), 10f64.powf(6.0 / 20.0), epsilon = 1e-6);
    }

    #[test]
    fn bandpass_has_unity_peak_at_center() {
        let bp = Biquad::new(FilterKind::Bandpass, BiquadParams::new(1400.0, 0.9), FS, 2);
        assert_relative_eq!(bp.magnitude_at(1400.0), 1.0, epsilon = 1e-6);
        assert!(bp.magnitude_at(100.0) < 0.2);
    }

    #[test]
    fn processing_a_dc_block_through_highpass_decays() {
        let mut hp = Biquad::new(FilterKind::Highpass, BiquadParams::new(200.0, 0.6), FS, 1);
        let mut last = 1.0f32;
        for _ in 0..50 {
            let mut block = AudioBlock::from_channels(vec![vec![1.0; 128]], 128);
            hp.process(&mut block);
            last = block.channel(0)[127];
        }
        assert!(last.abs() < 1e-3);
    }

    #[test]
    fn retune_keeps_state() {
        let mut lp = Biquad::new(FilterKind::Lowpass, BiquadParams::new(4200.0, 0.7), FS, 1);
        let mut block = AudioBlock::from_channels(vec![vec![1.0; 64]], 64);
        lp.process(&mut block);
        let settled = block.channel(0)[63];

        lp.set_params(BiquadParams::new(3800.0, 0.9));
        let mut next = AudioBlock::from_channels(vec![vec![1.0; 1]], 1);
        lp.process(&mut next);
        // Continues from the settled output instead of restarting from zero.
        assert!((next.channel(0)[0] - settled).abs() < 0.1);
        assert_eq!(lp.params(), BiquadParams::new(3800.0, 0.9));
    }

    #[test]
    fn reset_clears_history() {
        let mut lp = Biquad::new(FilterKind::Lowpass, BiquadParams::new(1000.0, 0.7), FS, 1);
        let mut block = AudioBlock::from_channels(vec![vec![1.0; 32]], 32);
        lp.process(&mut block);
        lp.reset();
        let mut silent = AudioBlock::new(1, 16);
        lp.process(&mut silent);
        assert!(silent.is_silent());
    }
}
