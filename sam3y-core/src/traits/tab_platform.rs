use std::future::Future;

use crate::models::error::PlatformError;
use crate::models::tab::{CaptureHandle, TabId, TabInfo};

/// Host-platform capabilities the coordinator calls into.
///
/// Implemented by the browser integration (and by `sam3y-sim` for testing).
/// Methods on a closed tab return [`PlatformError::StaleTab`].
pub trait TabPlatform: Send + Sync {
    /// The focused tab of the current window.
    fn active_tab(&self) -> impl Future<Output = Result<TabInfo, PlatformError>> + Send;

    /// All open tabs.
    fn query_tabs(&self) -> impl Future<Output = Result<Vec<TabInfo>, PlatformError>> + Send;

    /// Native mute state as the platform reports it.
    fn is_muted(&self, tab: TabId) -> impl Future<Output = Result<bool, PlatformError>> + Send;

    /// Set native mute. Idempotent.
    fn set_muted(
        &self,
        tab: TabId,
        muted: bool,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Issue a capture handle for the tab's audio.
    ///
    /// Fails with [`PlatformError::CaptureRefused`] when the platform will not
    /// allow capture (no user gesture, tab already captured, restricted page).
    fn capture_handle(
        &self,
        tab: TabId,
    ) -> impl Future<Output = Result<CaptureHandle, PlatformError>> + Send;
}
