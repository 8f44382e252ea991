//! In-process simulated browser.
//!
//! Implements the host-platform capabilities the coordinator consumes: tab
//! query, focus and removal events, native per-tab mute, and capture-handle
//! issuance. [`SimStreamAcquirer`] turns issued handles into oscillator
//! streams for the tab that was captured.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use sam3y_core::models::config::{CaptureConstraints, MediaSource};
use sam3y_core::models::error::{HostError, PlatformError};
use sam3y_core::models::messages::TabEvent;
use sam3y_core::models::tab::{CaptureHandle, TabId, TabInfo};
use sam3y_core::traits::media_stream::{MediaStream, StreamAcquirer};
use sam3y_core::traits::tab_platform::TabPlatform;

use crate::oscillator::{Oscillator, OscillatorStream, ToneSpec};

struct SimTab {
    info: TabInfo,
    tone: ToneSpec,
    /// Live flags of streams captured from this tab.
    streams: Vec<Arc<AtomicBool>>,
}

impl SimTab {
    fn is_captured(&self) -> bool {
        self.streams.iter().any(|live| live.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
struct Registry {
    tabs: BTreeMap<TabId, SimTab>,
    active: Option<TabId>,
    next_id: i32,
    handles_issued: u64,
    /// Issued but not yet redeemed; each handle works once.
    pending: HashMap<String, TabId>,
    refuse_capture: HashSet<TabId>,
    events: Option<mpsc::UnboundedSender<TabEvent>>,
}

impl Registry {
    fn emit(&self, event: TabEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                log::debug!("tab event {:?} dropped, no listener", event);
            }
        }
    }

    fn tab(&self, id: TabId) -> Result<&SimTab, PlatformError> {
        self.tabs.get(&id).ok_or(PlatformError::StaleTab(id))
    }

    fn tab_mut(&mut self, id: TabId) -> Result<&mut SimTab, PlatformError> {
        self.tabs.get_mut(&id).ok_or(PlatformError::StaleTab(id))
    }
}

/// Simulated browser window. Cheap to clone; clones share the same tabs.
#[derive(Clone, Default)]
pub struct SimBrowser {
    registry: Arc<Mutex<Registry>>,
}

impl SimBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start delivering tab events. Replaces any earlier subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TabEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.lock().events = Some(tx);
        rx
    }

    /// Open a tab playing `tone`. The first tab opened becomes active.
    pub fn open_tab(&self, url: &str, title: &str, tone: ToneSpec) -> TabId {
        let mut reg = self.registry.lock();
        reg.next_id += 1;
        let id = TabId(reg.next_id);
        Self::insert(&mut reg, id, url, title, tone);
        id
    }

    /// Open a tab with a caller-chosen id.
    pub fn open_tab_with_id(
        &self,
        id: TabId,
        url: &str,
        title: &str,
        tone: ToneSpec,
    ) -> Result<TabId, PlatformError> {
        let mut reg = self.registry.lock();
        if reg.tabs.contains_key(&id) {
            return Err(PlatformError::Unavailable(format!("tab {} already open", id)));
        }
        reg.next_id = reg.next_id.max(id.0);
        Self::insert(&mut reg, id, url, title, tone);
        Ok(id)
    }

    fn insert(reg: &mut Registry, id: TabId, url: &str, title: &str, tone: ToneSpec) {
        let active = reg.active.is_none();
        reg.tabs.insert(
            id,
            SimTab {
                info: TabInfo {
                    id,
                    url: url.to_string(),
                    title: title.to_string(),
                    active,
                    muted: false,
                },
                tone,
                streams: Vec::new(),
            },
        );
        log::debug!("sim: opened tab {} ({})", id, url);
        if active {
            reg.active = Some(id);
        }
    }

    /// Focus `tab` and emit `activated`.
    pub fn activate(&self, tab: TabId) -> Result<(), PlatformError> {
        let mut reg = self.registry.lock();
        reg.tab(tab)?;
        for t in reg.tabs.values_mut() {
            t.info.active = t.info.id == tab;
        }
        reg.active = Some(tab);
        reg.emit(TabEvent::Activated { tab_id: tab });
        Ok(())
    }

    /// Close `tab`: its streams end, its pending handles expire, and
    /// `removed` is emitted.
    pub fn close_tab(&self, tab: TabId) -> Result<(), PlatformError> {
        let mut reg = self.registry.lock();
        let closed = reg.tabs.remove(&tab).ok_or(PlatformError::StaleTab(tab))?;
        for live in &closed.streams {
            live.store(false, Ordering::SeqCst);
        }
        reg.pending.retain(|_, owner| *owner != tab);
        reg.refuse_capture.remove(&tab);
        if reg.active == Some(tab) {
            reg.active = None;
        }
        reg.emit(TabEvent::Removed { tab_id: tab });
        log::debug!("sim: closed tab {}", tab);
        Ok(())
    }

    /// Mute or unmute as the user would from the tab strip.
    pub fn set_user_muted(&self, tab: TabId, muted: bool) -> Result<(), PlatformError> {
        self.registry.lock().tab_mut(tab)?.info.muted = muted;
        Ok(())
    }

    /// Make capture-handle requests for `tab` fail, as on a restricted page.
    pub fn refuse_capture(&self, tab: TabId, refuse: bool) {
        let mut reg = self.registry.lock();
        if refuse {
            reg.refuse_capture.insert(tab);
        } else {
            reg.refuse_capture.remove(&tab);
        }
    }

    pub fn tab(&self, tab: TabId) -> Option<TabInfo> {
        self.registry.lock().tabs.get(&tab).map(|t| t.info.clone())
    }

    pub fn tabs(&self) -> Vec<TabInfo> {
        self.registry.lock().tabs.values().map(|t| t.info.clone()).collect()
    }

    /// Whether a stream captured from `tab` is still live.
    pub fn is_captured(&self, tab: TabId) -> bool {
        self.registry.lock().tabs.get(&tab).is_some_and(SimTab::is_captured)
    }

    /// Acquirer that redeems handles issued by this browser.
    pub fn stream_acquirer(&self) -> SimStreamAcquirer {
        SimStreamAcquirer {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl TabPlatform for SimBrowser {
    async fn active_tab(&self) -> Result<TabInfo, PlatformError> {
        let reg = self.registry.lock();
        let id = reg.active.ok_or(PlatformError::NoActiveTab)?;
        Ok(reg.tab(id)?.info.clone())
    }

    async fn query_tabs(&self) -> Result<Vec<TabInfo>, PlatformError> {
        Ok(self.tabs())
    }

    async fn is_muted(&self, tab: TabId) -> Result<bool, PlatformError> {
        Ok(self.registry.lock().tab(tab)?.info.muted)
    }

    async fn set_muted(&self, tab: TabId, muted: bool) -> Result<(), PlatformError> {
        self.registry.lock().tab_mut(tab)?.info.muted = muted;
        log::debug!("sim: tab {} muted={}", tab, muted);
        Ok(())
    }

    async fn capture_handle(&self, tab: TabId) -> Result<CaptureHandle, PlatformError> {
        let mut reg = self.registry.lock();
        let sim_tab = reg.tab(tab)?;
        if reg.refuse_capture.contains(&tab) {
            return Err(PlatformError::CaptureRefused(format!(
                "tab {} cannot be captured",
                tab
            )));
        }
        if sim_tab.is_captured() {
            return Err(PlatformError::CaptureRefused(format!(
                "tab {} is already being captured",
                tab
            )));
        }
        reg.handles_issued += 1;
        let token = format!("sim-stream-{}-{}", tab, reg.handles_issued);
        reg.pending.insert(token.clone(), tab);
        Ok(CaptureHandle::new(token))
    }
}

/// Redeems capture handles issued by a [`SimBrowser`].
#[derive(Clone)]
pub struct SimStreamAcquirer {
    registry: Arc<Mutex<Registry>>,
}

impl StreamAcquirer for SimStreamAcquirer {
    fn acquire(
        &self,
        handle: &CaptureHandle,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn MediaStream>, HostError> {
        if constraints.source != MediaSource::Tab {
            return Err(HostError::AcquisitionFailed("only tab capture is supported".into()));
        }
        let mut reg = self.registry.lock();
        let tab = reg.pending.remove(handle.as_str()).ok_or_else(|| {
            HostError::AcquisitionFailed(format!("capture handle {} is unknown or used", handle))
        })?;
        let sim_tab = reg
            .tabs
            .get_mut(&tab)
            .ok_or_else(|| HostError::AcquisitionFailed(format!("tab {} is gone", tab)))?;

        let live = Arc::new(AtomicBool::new(true));
        sim_tab.streams.retain(|l| l.load(Ordering::SeqCst));
        sim_tab.streams.push(Arc::clone(&live));
        let oscillator = Oscillator::new(sim_tab.tone, constraints.sample_rate);
        Ok(Box::new(OscillatorStream::new(handle.as_str(), oscillator, live)))
    }
}
