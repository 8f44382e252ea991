use std::sync::Arc;

use crate::models::audio_block::{AudioBlock, BlockFormat};
use crate::models::profile::Profile;

/// Slot for a learned source-separation model in the processing chain.
///
/// Contract: consumes fixed-size multichannel blocks at a known sample rate
/// and produces blocks of exactly the same shape. Implementations can be
/// swapped without touching the rest of the chain.
pub trait SeparationStage: Send {
    /// Inference backend name, e.g. `"passthrough"`.
    fn backend(&self) -> &str;

    /// Called once before the first block.
    fn prepare(&mut self, format: BlockFormat);

    fn set_profile(&mut self, profile: Profile);

    /// `input` and `output` share the prepared format.
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock);
}

/// Builds one separation stage per capture session.
pub type SeparationFactory = Arc<dyn Fn() -> Box<dyn SeparationStage> + Send + Sync + 'static>;
