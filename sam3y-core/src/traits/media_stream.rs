use crate::models::audio_block::AudioBlock;
use crate::models::config::CaptureConstraints;
use crate::models::error::HostError;
use crate::models::tab::CaptureHandle;

/// A live audio stream acquired for one tab.
///
/// Read from the render thread, one block per render quantum. Keep
/// `read_block` cheap and non-blocking.
pub trait MediaStream: Send {
    /// Platform identifier of the stream.
    fn id(&self) -> &str;

    /// Fill `block` with the next frames. Returns the number of frames
    /// written; the remainder of the block is left silent.
    fn read_block(&mut self, block: &mut AudioBlock) -> usize;

    /// Stop every track and release the underlying capture.
    fn stop_tracks(&mut self);

    /// Whether any track is still delivering audio.
    fn is_live(&self) -> bool;
}

/// Turns a capture handle into a live stream inside the audio host.
pub trait StreamAcquirer: Send + Sync {
    fn acquire(
        &self,
        handle: &CaptureHandle,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn MediaStream>, HostError>;
}
