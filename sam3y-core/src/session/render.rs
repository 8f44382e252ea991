use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;

use crate::models::audio_block::AudioBlock;
use crate::models::config::RenderConfig;
use crate::models::error::HostError;
use crate::models::tab::TabId;
use crate::processing::mixer::{self, OutputLevels};
use crate::processing::ring_buffer::RingBuffer;
use crate::session::capture::SessionNodes;

// Cap on quanta rendered per wake-up after a stall.
const MAX_CATCH_UP_QUANTA: u64 = 64;

/// Internal graph state, protected by `parking_lot::Mutex`.
struct RenderGraph {
    inputs: BTreeMap<TabId, Arc<Mutex<SessionNodes>>>,
    mix: AudioBlock,
    destination: RingBuffer,
    levels: OutputLevels,
    quanta_rendered: u64,
}

impl RenderGraph {
    fn render_quantum(&mut self) {
        self.mix.silence();
        for nodes in self.inputs.values() {
            let mut nodes = nodes.lock();
            nodes.render();
            mixer::mix_into(&mut self.mix, nodes.output());
        }
        self.levels = OutputLevels::measure(&self.mix);
        self.destination.write(&self.mix.interleaved());
        self.quanta_rendered += 1;
    }
}

/// The single shared audio-rendering context of the audio host.
///
/// Connected session chains are pulled once per render quantum, summed,
/// and written to the destination:
/// ```text
/// [tab A nodes] ─┐
///                ├→ [mix bus] → [destination ring buffer] + levels
/// [tab B nodes] ─┘
/// ```
/// Rendering runs on a dedicated thread once [`RenderContext::start`] is called.
pub struct RenderContext {
    config: RenderConfig,
    graph: Arc<Mutex<RenderGraph>>,
    running: Arc<AtomicBool>,
    render_handle: Option<thread::JoinHandle<()>>,
    closed: bool,
}

impl RenderContext {
    pub fn new(config: RenderConfig) -> Result<Self, HostError> {
        config.validate().map_err(HostError::LaunchFailed)?;
        let graph = RenderGraph {
            inputs: BTreeMap::new(),
            mix: AudioBlock::for_format(&config.block_format()),
            destination: RingBuffer::new(config.destination_frames(), config.channels as usize),
            levels: OutputLevels::default(),
            quanta_rendered: 0,
        };
        Ok(Self {
            config,
            graph: Arc::new(Mutex::new(graph)),
            running: Arc::new(AtomicBool::new(false)),
            render_handle: None,
            closed: false,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Spawn the render thread. No-op if already running.
    pub fn start(&mut self) -> Result<(), HostError> {
        if self.closed {
            return Err(HostError::LaunchFailed("render context is closed".into()));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let running = Arc::clone(&self.running);
        let graph = Arc::clone(&self.graph);
        let interval = self.config.render_interval;
        let quanta_per_sec = self.config.sample_rate / self.config.block_frames as f64;

        let handle = thread::Builder::new()
            .name("sam3y-render".into())
            .spawn(move || {
                let started = Instant::now();
                let mut rendered = 0u64;
                while running.load(Ordering::SeqCst) {
                    thread::sleep(interval);
                    let due = (started.elapsed().as_secs_f64() * quanta_per_sec) as u64;
                    if due.saturating_sub(rendered) > MAX_CATCH_UP_QUANTA {
                        rendered = due - MAX_CATCH_UP_QUANTA;
                    }
                    while rendered < due {
                        graph.lock().render_quantum();
                        rendered += 1;
                    }
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                HostError::LaunchFailed(format!("failed to spawn render thread: {}", e))
            })?;

        self.render_handle = Some(handle);
        log::debug!("render context started at {} Hz", self.config.sample_rate);
        Ok(())
    }

    /// Render a single quantum on the calling thread.
    pub fn render_quantum(&self) {
        self.graph.lock().render_quantum();
    }

    /// Attach a session's nodes to the mix bus.
    pub fn connect(&self, tab: TabId, nodes: Arc<Mutex<SessionNodes>>) {
        self.graph.lock().inputs.insert(tab, nodes);
    }

    /// Detach a session's nodes. Returns whether they were connected.
    pub fn disconnect(&self, tab: TabId) -> bool {
        self.graph.lock().inputs.remove(&tab).is_some()
    }

    pub fn connected_tabs(&self) -> Vec<TabId> {
        self.graph.lock().inputs.keys().copied().collect()
    }

    pub fn output_levels(&self) -> OutputLevels {
        self.graph.lock().levels
    }

    pub fn quanta_rendered(&self) -> u64 {
        self.graph.lock().quanta_rendered
    }

    /// Drain up to `frames` interleaved frames from the destination.
    pub fn read_destination(&self, frames: usize) -> Vec<f32> {
        self.graph.lock().destination.read(frames)
    }

    /// Stop rendering and detach everything. The context cannot be restarted.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.render_handle.take() {
            let _ = handle.join();
        }
        if !self.closed {
            let mut graph = self.graph.lock();
            graph.inputs.clear();
            graph.destination.clear();
            self.closed = true;
            log::debug!("render context closed after {} quanta", graph.quanta_rendered);
        }
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Profile;
    use crate::processing::separation::PassThroughSeparation;
    use crate::session::capture::tests::ToneStream;
    use std::time::Duration;

    fn nodes(level: f32) -> Arc<Mutex<SessionNodes>> {
        let config = RenderConfig::default();
        Arc::new(Mutex::new(SessionNodes::new(
            Box::new(ToneStream::new(1400.0, level)),
            config.block_format(),
            Profile::Balanced,
            Box::new(PassThroughSeparation::new()),
        )))
    }

    #[test]
    fn empty_context_renders_silence() {
        let ctx = RenderContext::new(RenderConfig::default()).unwrap();
        ctx.render_quantum();
        assert_eq!(ctx.quanta_rendered(), 1);
        let out = ctx.read_destination(128);
        assert_eq!(out.len(), 256);
        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(ctx.output_levels(), OutputLevels::default());
    }

    #[test]
    fn connected_sessions_reach_destination() {
        let ctx = RenderContext::new(RenderConfig::default()).unwrap();
        ctx.connect(TabId(1), nodes(0.05));
        for _ in 0..10 {
            ctx.render_quantum();
        }
        assert_eq!(ctx.connected_tabs(), vec![TabId(1)]);
        assert!(ctx.output_levels().peak > 0.0);

        assert!(ctx.disconnect(TabId(1)));
        assert!(!ctx.disconnect(TabId(1)));
        ctx.read_destination(usize::MAX);
        ctx.render_quantum();
        assert!(ctx.read_destination(128).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn render_thread_advances_and_stops() {
        let config = RenderConfig {
            render_interval: Duration::from_millis(2),
            ..Default::default()
        };
        let mut ctx = RenderContext::new(config).unwrap();
        ctx.start().unwrap();
        ctx.start().unwrap();
        assert!(ctx.is_running());
        thread::sleep(Duration::from_millis(40));
        ctx.close();
        assert!(!ctx.is_running());
        assert!(ctx.is_closed());
        assert!(ctx.quanta_rendered() > 0);
        assert!(ctx.start().is_err());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = RenderConfig {
            block_frames: 0,
            ..Default::default()
        };
        assert!(matches!(RenderContext::new(config), Err(HostError::LaunchFailed(_))));
    }
}
