use std::sync::Arc;

use crate::models::audio_block::{AudioBlock, BlockFormat};
use crate::models::profile::Profile;
use crate::traits::separation::{SeparationFactory, SeparationStage};

/// Transparent stand-in for the learned vocal separation stage.
///
/// Copies input to output. Output channels with no matching input channel
/// receive input channel 0, so a mono tab still fills a stereo chain.
#[derive(Debug, Clone)]
pub struct PassThroughSeparation {
    format: Option<BlockFormat>,
    profile: Profile,
}

impl PassThroughSeparation {
    pub fn new() -> Self {
        Self {
            format: None,
            profile: Profile::default(),
        }
    }

    pub fn factory() -> SeparationFactory {
        Arc::new(|| Box::new(PassThroughSeparation::new()) as Box<dyn SeparationStage>)
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn format(&self) -> Option<BlockFormat> {
        self.format
    }
}

impl Default for PassThroughSeparation {
    fn default() -> Self {
        Self::new()
    }
}

impl SeparationStage for PassThroughSeparation {
    fn backend(&self) -> &str {
        "passthrough"
    }

    fn prepare(&mut self, format: BlockFormat) {
        self.format = Some(format);
    }

    fn set_profile(&mut self, profile: Profile) {
        self.profile = profile;
    }

    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock) {
        if input.channel_count() == 0 {
            output.silence();
            return;
        }
        let frames = input.frames().min(output.frames());
        for ch in 0..output.channel_count() {
            let src = if ch < input.channel_count() { ch } else { 0 };
            let (src, dst) = (input.channel(src), output.channel_mut(ch));
            dst[..frames].copy_from_slice(&src[..frames]);
            dst[frames..].fill(0.0);
        }
    }
}
