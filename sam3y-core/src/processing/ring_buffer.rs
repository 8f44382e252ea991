/// Frame-oriented circular buffer of interleaved samples.
///
/// Backs the shared render destination. Overflow drops the oldest frames,
/// so the buffer always holds the most recent output.
#[derive(Debug)]
pub struct RingBuffer {
    samples: Vec<f32>,
    channels: usize,
    capacity_frames: usize,
    write_frame: usize,
    read_frame: usize,
    available_frames: usize,
}

impl RingBuffer {
    pub fn new(capacity_frames: usize, channels: usize) -> Self {
        let channels = channels.max(1);
        let capacity_frames = capacity_frames.max(1);
        Self {
            samples: vec![0.0; capacity_frames * channels],
            channels,
            capacity_frames,
            write_frame: 0,
            read_frame: 0,
            available_frames: 0,
        }
    }

    /// Append interleaved frames. A trailing partial frame is ignored.
    pub fn write(&mut self, interleaved: &[f32]) {
        let frames = interleaved.len() / self.channels;
        if frames == 0 {
            return;
        }
        // Only the newest `capacity_frames` can survive.
        let skip = frames.saturating_sub(self.capacity_frames);
        let kept = frames - skip;

        let overflow = (self.available_frames + kept).saturating_sub(self.capacity_frames);
        if overflow > 0 {
            self.read_frame = (self.read_frame + overflow) % self.capacity_frames;
            self.available_frames -= overflow;
        }

        for frame in interleaved[skip * self.channels..frames * self.channels].chunks_exact(self.channels) {
            let at = self.write_frame * self.channels;
            self.samples[at..at + self.channels].copy_from_slice(frame);
            self.write_frame = (self.write_frame + 1) % self.capacity_frames;
        }
        self.available_frames += kept;
    }

    /// Remove and return up to `frames` interleaved frames, oldest first.
    pub fn read(&mut self, frames: usize) -> Vec<f32> {
        let to_read = frames.min(self.available_frames);
        let mut out = Vec::with_capacity(to_read * self.channels);
        for i in 0..to_read {
            let at = ((self.read_frame + i) % self.capacity_frames) * self.channels;
            out.extend_from_slice(&self.samples[at..at + self.channels]);
        }
        self.read_frame = (self.read_frame + to_read) % self.capacity_frames;
        self.available_frames -= to_read;
        out
    }

    pub fn frames_available(&self) -> usize {
        self.available_frames
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    pub fn is_empty(&self) -> bool {
        self.available_frames == 0
    }

    pub fn clear(&mut self) {
        self.write_frame = 0;
        self.read_frame = 0;
        self.available_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_write_read() {
        let mut buf = RingBuffer::new(4, 2);
        buf.write(&[1.0, -1.0, 2.0, -2.0]);
        assert_eq!(buf.frames_available(), 2);
        assert_eq!(buf.read(1), vec![1.0, -1.0]);
        assert_eq!(buf.read(5), vec![2.0, -2.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_keeps_newest_frames() {
        let mut buf = RingBuffer::new(2, 2);
        buf.write(&[1.0, 1.0, 2.0, 2.0]);
        buf.write(&[3.0, 3.0]);
        assert_eq!(buf.read(2), vec![2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn oversized_write_keeps_tail() {
        let mut buf = RingBuffer::new(2, 1);
        buf.write(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buf.read(2), vec![3.0, 4.0]);
    }

    #[test]
    fn partial_frame_ignored() {
        let mut buf = RingBuffer::new(4, 2);
        buf.write(&[1.0, 2.0, 3.0]);
        assert_eq!(buf.frames_available(), 1);
    }

    #[test]
    fn wraparound_and_clear() {
        let mut buf = RingBuffer::new(3, 1);
        buf.write(&[1.0, 2.0]);
        buf.read(2);
        buf.write(&[3.0, 4.0, 5.0]);
        assert_eq!(buf.read(3), vec![3.0, 4.0, 5.0]);
        buf.write(&[6.0]);
        buf.clear();
        assert!(buf.read(1).is_empty());
        assert_eq!(buf.capacity_frames(), 3);
    }
}
