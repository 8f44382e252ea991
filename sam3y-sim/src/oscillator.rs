//! Synthetic tab audio.
//!
//! Each simulated tab plays one oscillator; capturing the tab hands out an
//! [`OscillatorStream`] that renders it block by block.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sam3y_core::models::audio_block::AudioBlock;
use sam3y_core::traits::media_stream::MediaStream;

/// Default oscillator level for simulated pages.
pub const DEFAULT_AMPLITUDE: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Silence,
}

/// What a simulated tab is playing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToneSpec {
    pub waveform: Waveform,
    pub frequency_hz: f64,
    pub amplitude: f32,
}

impl ToneSpec {
    pub fn sine(frequency_hz: f64) -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency_hz,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }

    pub fn square(frequency_hz: f64) -> Self {
        Self {
            waveform: Waveform::Square,
            frequency_hz,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }

    pub fn silence() -> Self {
        Self {
            waveform: Waveform::Silence,
            frequency_hz: 0.0,
            amplitude: 0.0,
        }
    }
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self::sine(440.0)
    }
}

/// Phase-continuous oscillator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    spec: ToneSpec,
    sample_rate: f64,
    phase: f64,
}

impl Oscillator {
    pub fn new(spec: ToneSpec, sample_rate: f64) -> Self {
        Self {
            spec,
            sample_rate,
            phase: 0.0,
        }
    }

    pub fn spec(&self) -> ToneSpec {
        self.spec
    }

    fn next_sample(&mut self) -> f32 {
        let value = match self.spec.waveform {
            Waveform::Sine => (TAU * self.phase).sin() as f32,
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Silence => 0.0,
        };
        self.phase = (self.phase + self.spec.frequency_hz / self.sample_rate).fract();
        value * self.spec.amplitude
    }

    /// Write the same signal to every channel of `block`.
    pub fn fill(&mut self, block: &mut AudioBlock) {
        for frame in 0..block.frames() {
            let v = self.next_sample();
            for ch in block.channels_mut() {
                ch[frame] = v;
            }
        }
    }
}

/// A captured tab's live audio.
///
/// `live` is shared with the browser so closing the tab ends the stream.
pub struct OscillatorStream {
    id: String,
    oscillator: Oscillator,
    live: Arc<AtomicBool>,
}

impl OscillatorStream {
    pub fn new(id: impl Into<String>, oscillator: Oscillator, live: Arc<AtomicBool>) -> Self {
        Self {
            id: id.into(),
            oscillator,
            live,
        }
    }
}

impl MediaStream for OscillatorStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_block(&mut self, block: &mut AudioBlock) -> usize {
        if !self.is_live() {
            block.silence();
            return 0;
        }
        self.oscillator.fill(block);
        block.frames()
    }

    fn stop_tracks(&mut self) {
        if self.live.swap(false, Ordering::SeqCst) {
            log::debug!("stream {}: tracks stopped", self.id);
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sam3y_core::processing::mixer::{peak_level, rms_level};

    fn render(spec: ToneSpec, frames: usize) -> AudioBlock {
        let mut block = AudioBlock::new(2, frames);
        Oscillator::new(spec, 48000.0).fill(&mut block);
        block
    }

    #[test]
    fn sine_has_expected_level() {
        // Whole number of periods.
        let block = render(ToneSpec::sine(480.0), 4800);
        assert_relative_eq!(peak_level(block.channel(0)), 0.05, epsilon = 1e-4);
        assert_relative_eq!(rms_level(block.channel(0)), 0.05 / 2f32.sqrt(), epsilon = 1e-4);
        assert_eq!(block.channel(0), block.channel(1));
    }

    #[test]
    fn square_alternates_at_amplitude() {
        let block = render(ToneSpec::square(660.0), 4800);
        assert!(block.channel(0).iter().all(|s| s.abs() == 0.05));
        assert_relative_eq!(rms_level(block.channel(0)), 0.05, epsilon = 1e-5);
    }

    #[test]
    fn silence_is_silent() {
        assert!(render(ToneSpec::silence(), 256).is_silent());
    }

    #[test]
    fn stopped_stream_reads_silence() {
        let live = Arc::new(AtomicBool::new(true));
        let mut stream = OscillatorStream::new(
            "s1",
            Oscillator::new(ToneSpec::sine(440.0), 48000.0),
            Arc::clone(&live),
        );
        let mut block = AudioBlock::new(2, 128);
        assert_eq!(stream.read_block(&mut block), 128);
        assert!(!block.is_silent());

        stream.stop_tracks();
        assert!(!live.load(Ordering::SeqCst));
        assert_eq!(stream.read_block(&mut block), 0);
        assert!(block.is_silent());
    }
}
