use crate::models::audio_block::AudioBlock;

/// Sum `src` into `dest`, channel by channel.
///
/// A mono source is spread across every destination channel. Extra source
/// channels beyond the destination's count are dropped.
pub fn mix_into(dest: &mut AudioBlock, src: &AudioBlock) {
    if src.channel_count() == 0 {
        return;
    }
    let frames = dest.frames().min(src.frames());
    for ch in 0..dest.channel_count() {
        let src_ch = if src.channel_count() == 1 { 0 } else { ch };
        if src_ch >= src.channel_count() {
            continue;
        }
        let (s, d) = (src.channel(src_ch), dest.channel_mut(ch));
        for i in 0..frames {
            d[i] += s[i];
        }
    }
}

/// RMS level of samples (0.0–1.0 range for normalized audio).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Output metering at the shared destination.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutputLevels {
    pub rms: f32,
    pub peak: f32,
}

impl OutputLevels {
    pub fn measure(block: &AudioBlock) -> Self {
        let interleaved = block.interleaved();
        Self {
            rms: rms_level(&interleaved),
            peak: peak_level(&interleaved),
        }
    }
}
