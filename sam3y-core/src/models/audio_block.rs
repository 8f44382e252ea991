/// Shape of the blocks flowing through a processing chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockFormat {
    pub sample_rate: f64,
    pub channels: u16,
    pub frames: usize,
}

/// Fixed-size block of planar multichannel f32 samples.
///
/// Every channel always holds exactly `frames` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl AudioBlock {
    /// A silent block.
    pub fn new(channels: u16, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channels as usize],
            frames,
        }
    }

    pub fn for_format(format: &BlockFormat) -> Self {
        Self::new(format.channels, format.frames)
    }

    /// Build from planar data; shorter channels are zero-padded, longer ones truncated.
    pub fn from_channels(data: Vec<Vec<f32>>, frames: usize) -> Self {
        let channels = data
            .into_iter()
            .map(|mut ch| {
                ch.resize(frames, 0.0);
                ch
            })
            .collect();
        Self { channels, frames }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    pub fn silence(&mut self) {
        for ch in &mut self.channels {
            ch.fill(0.0);
        }
    }

    pub fn is_silent(&self) -> bool {
        self.channels.iter().flatten().all(|s| *s == 0.0)
    }

    pub fn apply_gain(&mut self, gain: f32) {
        for ch in &mut self.channels {
            for s in ch.iter_mut() {
                *s *= gain;
            }
        }
    }

    /// Interleave into `[L0, R0, L1, R1, ...]`.
    pub fn interleaved(&self) -> Vec<f32> {
        let n = self.channels.len();
        let mut out = vec![0.0f32; self.frames * n];
        for (c, ch) in self.channels.iter().enumerate() {
            for (i, s) in ch.iter().enumerate() {
                out[i * n + c] = *s;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_is_silent() {
        let block = AudioBlock::new(2, 128);
        assert_eq!(block.channel_count(), 2);
        assert_eq!(block.frames(), 128);
        assert!(block.is_silent());
    }

    #[test]
    fn from_channels_pads_and_truncates() {
        let block = AudioBlock::from_channels(vec![vec![1.0], vec![1.0, 2.0, 3.0, 4.0]], 3);
        assert_eq!(block.channel(0), &[1.0, 0.0, 0.0]);
        assert_eq!(block.channel(1), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn interleave_order() {
        let block = AudioBlock::from_channels(vec![vec![1.0, 2.0], vec![-1.0, -2.0]], 2);
        assert_eq!(block.interleaved(), vec![1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn gain_and_silence() {
        let mut block = AudioBlock::from_channels(vec![vec![0.5, -0.5]], 2);
        block.apply_gain(2.0);
        assert_eq!(block.channel(0), &[1.0, -1.0]);
        block.silence();
        assert!(block.is_silent());
    }
}
