//! Message contract between the execution contexts.
//!
//! Intents use `{"type": "<name>", ...}` (control surface → coordinator).
//! Host commands use `{"type": "host:<name>", ...}` (coordinator → audio host).
//! Every response carries an explicit `ok` flag.

use serde::{Deserialize, Serialize};

use super::error::CoordinatorError;
use super::profile::Profile;
use super::tab::{CaptureHandle, TabId};

// ---------------------------------------------------------------------------
// Intents: control surface -> coordinator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Intent {
    ToggleCurrentTab,
    ToggleGlobal,
    SetProfile {
        profile: Profile,
    },
    /// Test hook: start a session for the tab with this URL or title.
    StartForUrl {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    /// Test hook: stop the session for the tab with this URL or title.
    StopForUrl {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    GetState,
}

/// Response to an [`Intent`]. Fields beyond `ok` depend on the intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracked_muted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tab_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntentResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn failed(error: &CoordinatorError) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::ok()
        }
    }

    pub fn tracked(tab: TabId, tracked_muted: bool) -> Self {
        Self {
            tab_id: Some(tab),
            tracked_muted: Some(tracked_muted),
            ..Self::ok()
        }
    }

    pub fn snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            global_enabled: Some(snapshot.global_enabled),
            current_tab_enabled: Some(snapshot.current_tab_enabled),
            profile: Some(snapshot.profile),
            ..Self::ok()
        }
    }
}

/// What a control surface renders: global flag, active tab flag, profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub global_enabled: bool,
    pub current_tab_enabled: bool,
    pub profile: Profile,
}

// ---------------------------------------------------------------------------
// Host commands: coordinator -> audio processing host
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostCommand {
    #[serde(rename = "host:start", rename_all = "camelCase")]
    Start {
        tab_id: TabId,
        capture_handle: CaptureHandle,
    },
    #[serde(rename = "host:stop", rename_all = "camelCase")]
    Stop { tab_id: TabId },
    #[serde(rename = "host:stop-all")]
    StopAll,
    #[serde(rename = "host:set-profile")]
    SetProfile { profile: Profile },
    #[serde(rename = "host:status")]
    Status,
    #[serde(rename = "host:shutdown")]
    Shutdown,
}

impl HostCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "host:start",
            Self::Stop { .. } => "host:stop",
            Self::StopAll => "host:stop-all",
            Self::SetProfile { .. } => "host:set-profile",
            Self::Status => "host:status",
            Self::Shutdown => "host:shutdown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tabs: Option<Vec<TabId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl HostReply {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn status(tabs: Vec<TabId>, profile: Profile) -> Self {
        Self {
            tabs: Some(tabs),
            profile: Some(profile),
            ..Self::ok()
        }
    }
}

// ---------------------------------------------------------------------------
// Platform events: host platform -> coordinator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TabEvent {
    #[serde(rename_all = "camelCase")]
    Removed { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    Activated { tab_id: TabId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_wire_names() {
        let i: Intent = serde_json::from_str(r#"{"type":"toggle-current-tab"}"#).unwrap();
        assert_eq!(i, Intent::ToggleCurrentTab);

        let i: Intent = serde_json::from_str(r#"{"type":"set-profile","profile":"best"}"#).unwrap();
        assert_eq!(i, Intent::SetProfile { profile: Profile::Best });

        let i: Intent =
            serde_json::from_str(r#"{"type":"start-for-url","title":"Audio Test"}"#).unwrap();
        assert_eq!(
            i,
            Intent::StartForUrl {
                url: None,
                title: Some("Audio Test".into())
            }
        );
    }

    #[test]
    fn response_omits_unset_fields() {
        let json = serde_json::to_string(&IntentResponse::enabled(true)).unwrap();
        assert_eq!(json, r#"{"ok":true,"enabled":true}"#);

        let json = serde_json::to_string(&IntentResponse::tracked(TabId(7), false)).unwrap();
        assert_eq!(json, r#"{"ok":true,"tabId":7,"trackedMuted":false}"#);
    }

    #[test]
    fn failed_response_reports_error() {
        let err = CoordinatorError::TabNotFound("url=x".into());
        let resp = IntentResponse::failed(&err);
        assert!(!resp.ok);
        assert_eq!(resp.error.as_deref(), Some("no tab matches url=x"));
    }

    #[test]
    fn host_command_wire_names() {
        let cmd = HostCommand::Start {
            tab_id: TabId(3),
            capture_handle: CaptureHandle::new("abc"),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"type":"host:start","tabId":3,"captureHandle":"abc"}"#);

        let cmd: HostCommand = serde_json::from_str(r#"{"type":"host:stop-all"}"#).unwrap();
        assert_eq!(cmd, HostCommand::StopAll);
        assert_eq!(cmd.name(), "host:stop-all");
    }

    #[test]
    fn tab_event_wire_format() {
        let e: TabEvent = serde_json::from_str(r#"{"event":"removed","tabId":4}"#).unwrap();
        assert_eq!(e, TabEvent::Removed { tab_id: TabId(4) });
    }
}
