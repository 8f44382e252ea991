use thiserror::Error;

use super::tab::TabId;

/// Failures reported by the host platform (tabs, native mute, capture handles).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("tab {0} no longer exists")]
    StaleTab(TabId),

    #[error("capture refused: {0}")]
    CaptureRefused(String),

    #[error("no active tab")]
    NoActiveTab,

    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the persisted state store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(String),

    #[error("store write failed: {0}")]
    Write(String),

    #[error("stored state is corrupt: {0}")]
    Corrupt(String),
}

/// Failures talking to, or reported by, the audio processing host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("audio host unreachable")]
    Unreachable,

    #[error("audio host did not answer in time")]
    Timeout,

    #[error("audio host launch failed: {0}")]
    LaunchFailed(String),

    #[error("stream acquisition failed: {0}")]
    AcquisitionFailed(String),

    #[error("audio host rejected command: {0}")]
    Rejected(String),
}

impl HostError {
    /// Stop-side callers treat these as "already stopped".
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable)
    }
}

/// Errors surfaced by coordinator operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("no tab matches {0}")]
    TabNotFound(String),
}
