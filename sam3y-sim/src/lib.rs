//! # sam3y-sim
//!
//! Simulated browser backend for sam3y-core.
//!
//! Provides:
//! - `SimBrowser`: tabs, focus and removal events, native mute, capture handles
//! - `SimStreamAcquirer`: redeems capture handles as oscillator streams
//! - `Bridge`: JSON-lines intent bridge used by the `sam3y-sim` binary
//!
//! ## Usage
//! ```ignore
//! use sam3y_sim::{build_coordinator, SimBrowser, ToneSpec};
//! use sam3y_core::{CoordinatorConfig, MemoryStore, Intent};
//!
//! let browser = SimBrowser::new();
//! browser.open_tab("http://127.0.0.1/a", "Audio Test", ToneSpec::sine(440.0));
//! let coordinator = build_coordinator(&browser, MemoryStore::new(), CoordinatorConfig::default());
//! let reply = coordinator.dispatch(Intent::ToggleCurrentTab).await;
//! ```

pub mod bridge;
pub mod browser;
pub mod config;
pub mod oscillator;

use sam3y_core::models::config::CoordinatorConfig;
use sam3y_core::session::coordinator::SessionCoordinator;
use sam3y_core::session::launcher::LocalHostLauncher;
use sam3y_core::traits::state_store::StateStore;

pub use bridge::{Bridge, BridgeRequest, BridgeResponse, BrowserCommand};
pub use browser::{SimBrowser, SimStreamAcquirer};
pub use config::{ConfigError, SimConfig};
pub use oscillator::{Oscillator, OscillatorStream, ToneSpec, Waveform};

/// Coordinator wired to the simulated browser.
pub type SimCoordinator<S> = SessionCoordinator<SimBrowser, S, LocalHostLauncher<SimStreamAcquirer>>;

/// Build a coordinator whose host captures from `browser`'s tabs.
pub fn build_coordinator<S: StateStore>(
    browser: &SimBrowser,
    store: S,
    config: CoordinatorConfig,
) -> SimCoordinator<S> {
    let launcher = LocalHostLauncher::new(browser.stream_acquirer(), config);
    SessionCoordinator::new(browser.clone(), store, launcher)
}
