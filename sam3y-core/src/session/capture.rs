use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::models::audio_block::{AudioBlock, BlockFormat};
use crate::models::config::CaptureConstraints;
use crate::models::error::HostError;
use crate::models::profile::Profile;
use crate::models::tab::{CaptureHandle, TabId};
use crate::processing::chain::ProcessingChain;
use crate::traits::media_stream::{MediaStream, StreamAcquirer};
use crate::traits::separation::SeparationStage;

/// The stream and node graph of one session, shared with the render thread.
pub struct SessionNodes {
    stream: Box<dyn MediaStream>,
    chain: ProcessingChain,
    input: AudioBlock,
    output: AudioBlock,
}

impl SessionNodes {
    pub fn new(
        stream: Box<dyn MediaStream>,
        format: BlockFormat,
        profile: Profile,
        separation: Box<dyn SeparationStage>,
    ) -> Self {
        Self {
            stream,
            chain: ProcessingChain::new(format, profile, separation),
            input: AudioBlock::for_format(&format),
            output: AudioBlock::for_format(&format),
        }
    }

    /// Pull one block from the stream and run it through the chain.
    pub fn render(&mut self) {
        self.input.silence();
        if self.stream.is_live() {
            self.stream.read_block(&mut self.input);
        }
        self.chain.process(&self.input, &mut self.output);
    }

    pub fn output(&self) -> &AudioBlock {
        &self.output
    }

    pub fn chain(&self) -> &ProcessingChain {
        &self.chain
    }

    pub fn stream_id(&self) -> &str {
        self.stream.id()
    }

    pub fn is_stream_live(&self) -> bool {
        self.stream.is_live()
    }

    fn set_profile(&mut self, profile: Profile) {
        self.chain.set_profile(profile);
    }

    fn stop(&mut self) {
        self.stream.stop_tracks();
        self.input.silence();
        self.output.silence();
    }
}

/// Read-only view of a live session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub tab: TabId,
    pub stream_id: String,
    pub profile: Profile,
    pub started_at: DateTime<Utc>,
}

/// One tab's capture pipeline: acquired stream plus processing graph.
///
/// Owned by the audio host, one per tab. The nodes are shared with the
/// render context while connected. The host disconnects them before
/// [`CaptureSession::teardown`] stops the stream's tracks.
pub struct CaptureSession {
    id: String,
    tab: TabId,
    started_at: DateTime<Utc>,
    nodes: Arc<Mutex<SessionNodes>>,
}

impl CaptureSession {
    /// Acquire the tab's stream and build its chain. Nothing is connected yet.
    pub fn open<A: StreamAcquirer + ?Sized>(
        tab: TabId,
        handle: &CaptureHandle,
        acquirer: &A,
        constraints: &CaptureConstraints,
        format: BlockFormat,
        profile: Profile,
        separation: Box<dyn SeparationStage>,
    ) -> Result<Self, HostError> {
        let stream = acquirer.acquire(handle, constraints)?;
        if !stream.is_live() {
            return Err(HostError::AcquisitionFailed(format!(
                "stream {} for tab {} has no live tracks",
                stream.id(),
                tab
            )));
        }
        let nodes = SessionNodes::new(stream, format, profile, separation);
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            tab,
            started_at: Utc::now(),
            nodes: Arc::new(Mutex::new(nodes)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn nodes(&self) -> Arc<Mutex<SessionNodes>> {
        Arc::clone(&self.nodes)
    }

    pub fn profile(&self) -> Profile {
        self.nodes.lock().chain.profile()
    }

    /// Retune in place. Holding the nodes lock keeps the render thread from
    /// seeing a half-applied profile.
    pub fn set_profile(&self, profile: Profile) {
        self.nodes.lock().set_profile(profile);
    }

    pub fn info(&self) -> SessionInfo {
        let nodes = self.nodes.lock();
        SessionInfo {
            id: self.id.clone(),
            tab: self.tab,
            stream_id: nodes.stream_id().to_string(),
            profile: nodes.chain.profile(),
            started_at: self.started_at,
        }
    }

    /// Release the stream. Caller disconnects from the render context first.
    pub fn teardown(self) {
        self.nodes.lock().stop();
        log::debug!("session {} for tab {} torn down", self.id, self.tab);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::processing::separation::PassThroughSeparation;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Sine test stream; `stopped` lets tests observe teardown.
    pub(crate) struct ToneStream {
        freq: f64,
        amplitude: f32,
        position: u64,
        pub(crate) stopped: Arc<AtomicBool>,
    }

    impl ToneStream {
        pub(crate) fn new(freq: f64, amplitude: f32) -> Self {
            Self {
                freq,
                amplitude,
                position: 0,
                stopped: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl MediaStream for ToneStream {
        fn id(&self) -> &str {
            "tone"
        }

        fn read_block(&mut self, block: &mut AudioBlock) -> usize {
            let frames = block.frames();
            for i in 0..frames {
                let t = (self.position + i as u64) as f64 / 48000.0;
                let v = self.amplitude * (2.0 * std::f64::consts::PI * self.freq * t).sin() as f32;
                for ch in block.channels_mut() {
                    ch[i] = v;
                }
            }
            self.position += frames as u64;
            frames
        }

        fn stop_tracks(&mut self) {
            self.stopped.store(true, Ordering::SeqCst);
        }

        fn is_live(&self) -> bool {
            !self.stopped.load(Ordering::SeqCst)
        }
    }

    /// Acquirer that hands out tone streams, or refuses `"denied"` handles.
    #[derive(Clone)]
    pub(crate) struct ToneAcquirer {
        pub(crate) last_stopped: Arc<Mutex<Option<Arc<AtomicBool>>>>,
        delay: Option<std::time::Duration>,
    }

    impl ToneAcquirer {
        pub(crate) fn new() -> Self {
            Self {
                last_stopped: Arc::new(Mutex::new(None)),
                delay: None,
            }
        }

        /// Block every acquisition for `delay`, like a slow permission prompt.
        pub(crate) fn with_delay(delay: std::time::Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new()
            }
        }
    }

    impl StreamAcquirer for ToneAcquirer {
        fn acquire(
            &self,
            handle: &CaptureHandle,
            _constraints: &CaptureConstraints,
        ) -> Result<Box<dyn MediaStream>, HostError> {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if handle.as_str() == "denied" {
                return Err(HostError::AcquisitionFailed("permission denied".into()));
            }
            let stream = ToneStream::new(1000.0, 0.05);
            *self.last_stopped.lock() = Some(Arc::clone(&stream.stopped));
            Ok(Box::new(stream))
        }
    }

    fn open(handle: &str, profile: Profile) -> (Result<CaptureSession, HostError>, ToneAcquirer) {
        let acquirer = ToneAcquirer::new();
        let format = crate::models::config::RenderConfig::default().block_format();
        let session = CaptureSession::open(
            TabId(7),
            &CaptureHandle::new(handle),
            &acquirer,
            &CaptureConstraints::default(),
            format,
            profile,
            Box::new(PassThroughSeparation::new()),
        );
        (session, acquirer)
    }

    #[test]
    fn open_uses_requested_profile() {
        let (session, _) = open("ok", Profile::Best);
        let session = session.unwrap();
        assert_eq!(session.tab(), TabId(7));
        assert_eq!(session.profile(), Profile::Best);
        assert_eq!(session.info().stream_id, "tone");
        assert!(!session.id().is_empty());
    }

    #[test]
    fn acquisition_failure_is_reported() {
        let (session, _) = open("denied", Profile::Balanced);
        assert!(matches!(session, Err(HostError::AcquisitionFailed(_))));
    }

    #[test]
    fn set_profile_applies_in_place() {
        let (session, _) = open("ok", Profile::Balanced);
        let session = session.unwrap();
        let nodes = session.nodes();
        session.set_profile(Profile::Fast);
        assert_eq!(nodes.lock().chain().profile(), Profile::Fast);
        assert!(Arc::ptr_eq(&nodes, &session.nodes()));
    }

    #[test]
    fn teardown_stops_tracks() {
        let (session, acquirer) = open("ok", Profile::Balanced);
        let session = session.unwrap();
        let nodes = session.nodes();
        session.teardown();
        let stopped = acquirer.last_stopped.lock().clone().unwrap();
        assert!(stopped.load(Ordering::SeqCst));
        assert!(!nodes.lock().is_stream_live());
    }

    #[test]
    fn render_produces_processed_audio() {
        let (session, _) = open("ok", Profile::Balanced);
        let session = session.unwrap();
        let nodes = session.nodes();
        let mut peak = 0.0f32;
        for _ in 0..20 {
            let mut n = nodes.lock();
            n.render();
            peak = peak.max(crate::processing::mixer::peak_level(n.output().channel(0)));
        }
        assert!(peak > 0.01);
    }
}
