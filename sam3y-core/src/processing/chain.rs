use crate::models::audio_block::{AudioBlock, BlockFormat};
use crate::models::profile::Profile;
use crate::processing::biquad::{Biquad, FilterKind};
use crate::processing::compressor::Compressor;
use crate::traits::separation::SeparationStage;

/// One tab's voice-emphasis chain:
///
/// ```text
/// source → separation → highpass → bandpass → lowpass → compressor → gain → destination
/// ```
///
/// Every parameter is a function of the current [`Profile`]. Retuning
/// happens in place between blocks, never mid-block.
pub struct ProcessingChain {
    format: BlockFormat,
    profile: Profile,
    separation: Box<dyn SeparationStage>,
    highpass: Biquad,
    bandpass: Biquad,
    lowpass: Biquad,
    compressor: Compressor,
    output_gain: f32,
}

impl ProcessingChain {
    pub fn new(format: BlockFormat, profile: Profile, mut separation: Box<dyn SeparationStage>) -> Self {
        let preset = profile.preset();
        let channels = format.channels as usize;
        separation.prepare(format);
        separation.set_profile(profile);
        Self {
            format,
            profile,
            separation,
            highpass: Biquad::new(FilterKind::Highpass, preset.highpass, format.sample_rate, channels),
            bandpass: Biquad::new(FilterKind::Bandpass, preset.bandpass, format.sample_rate, channels),
            lowpass: Biquad::new(FilterKind::Lowpass, preset.lowpass, format.sample_rate, channels),
            compressor: Compressor::new(preset.compressor, format.sample_rate),
            output_gain: preset.output_gain,
        }
    }

    pub fn format(&self) -> BlockFormat {
        self.format
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn separation_backend(&self) -> &str {
        self.separation.backend()
    }

    pub fn highpass(&self) -> &Biquad {
        &self.highpass
    }

    pub fn bandpass(&self) -> &Biquad {
        &self.bandpass
    }

    pub fn lowpass(&self) -> &Biquad {
        &self.lowpass
    }

    pub fn compressor(&self) -> &Compressor {
        &self.compressor
    }

    pub fn output_gain(&self) -> f32 {
        self.output_gain
    }

    /// Re-parameterize every stage without rebuilding or reconnecting.
    pub fn set_profile(&mut self, profile: Profile) {
        let preset = profile.preset();
        self.separation.set_profile(profile);
        self.highpass.set_params(preset.highpass);
        self.bandpass.set_params(preset.bandpass);
        self.lowpass.set_params(preset.lowpass);
        self.compressor.set_params(preset.compressor);
        self.output_gain = preset.output_gain;
        self.profile = profile;
    }

    /// Run one block through every stage. `output` must match the chain format.
    pub fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock) {
        self.separation.process(input, output);
        self.highpass.process(output);
        self.bandpass.process(output);
        self.lowpass.process(output);
        self.compressor.process(output);
        output.apply_gain(self.output_gain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::BiquadParams;
    use crate::processing::separation::PassThroughSeparation;

    fn format() -> BlockFormat {
        BlockFormat {
            sample_rate: 48000.0,
            channels: 2,
            frames: 128,
        }
    }

    fn chain(profile: Profile) -> ProcessingChain {
        ProcessingChain::new(format(), profile, Box::new(PassThroughSeparation::new()))
    }

    fn sine_block(freq: f64, amplitude: f32, offset: usize) -> AudioBlock {
        let samples: Vec<f32> = (0..128)
            .map(|i| {
                let t = (offset + i) as f64 / 48000.0;
                amplitude * (2.0 * std::f64::consts::PI * freq * t).sin() as f32
            })
            .collect();
        AudioBlock::from_channels(vec![samples.clone(), samples], 128)
    }

    fn steady_peak(chain: &mut ProcessingChain, freq: f64) -> f32 {
        let mut peak = 0.0f32;
        for n in 0..200 {
            let input = sine_block(freq, 0.05, n * 128);
            let mut output = AudioBlock::new(2, 128);
            chain.process(&input, &mut output);
            if n >= 150 {
                peak = peak.max(output.channel(0).iter().fold(0.0f32, |a, s| a.max(s.abs())));
            }
        }
        peak
    }

    #[test]
    fn built_from_profile_preset() {
        let c = chain(Profile::Best);
        assert_eq!(c.highpass().params(), BiquadParams::new(260.0, 0.9));
        assert_eq!(c.bandpass().params(), BiquadParams::new(1600.0, 1.1));
        assert_eq!(c.lowpass().params(), BiquadParams::new(3800.0, 0.9));
        assert_eq!(c.compressor().params().knee_db, 30.0);
        assert_eq!(c.output_gain(), 1.1);
        assert_eq!(c.separation_backend(), "passthrough");
    }

    #[test]
    fn set_profile_retunes_every_stage() {
        let mut c = chain(Profile::Balanced);
        c.set_profile(Profile::Fast);
        let fast = Profile::Fast.preset();
        assert_eq!(c.profile(), Profile::Fast);
        assert_eq!(c.highpass().params(), fast.highpass);
        assert_eq!(c.bandpass().params(), fast.bandpass);
        assert_eq!(c.lowpass().params(), fast.lowpass);
        assert_eq!(c.compressor().params(), fast.compressor);
    }

    #[test]
    fn fast_knee_does_not_depend_on_previous_profile() {
        let mut from_balanced = chain(Profile::Balanced);
        from_balanced.set_profile(Profile::Fast);
        let mut from_best = chain(Profile::Best);
        from_best.set_profile(Profile::Fast);
        assert_eq!(from_balanced.compressor().params().knee_db, 30.0);
        assert_eq!(from_best.compressor().params().knee_db, 30.0);
    }

    #[test]
    fn voice_band_passes_bass_is_cut() {
        let mut voice = chain(Profile::Balanced);
        let mut bass = chain(Profile::Balanced);
        let voice_peak = steady_peak(&mut voice, 1400.0);
        let bass_peak = steady_peak(&mut bass, 60.0);
        assert!(voice_peak > 0.03, "voice peak {}", voice_peak);
        assert!(bass_peak < voice_peak / 10.0, "bass {} voice {}", bass_peak, voice_peak);
    }

    #[test]
    fn silence_in_silence_out() {
        let mut c = chain(Profile::Fast);
        let input = AudioBlock::new(2, 128);
        let mut output = AudioBlock::new(2, 128);
        c.process(&input, &mut output);
        assert!(output.is_silent());
    }
}
