use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque browser tab handle issued by the host platform.
///
/// Never allocated by this crate. A `TabId` may go stale at any time
/// (the tab was closed); operations on stale tabs are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for TabId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Platform-issued token authorizing access to one tab's audio stream.
///
/// Single use on most platforms: acquire the stream promptly after issuing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureHandle(pub String);

impl CaptureHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the host platform reports about a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub active: bool,
    pub muted: bool,
}

impl TabInfo {
    /// Test-hook lookup: exact URL or exact title match.
    pub fn matches(&self, url: Option<&str>, title: Option<&str>) -> bool {
        url.is_some_and(|u| u == self.url) || title.is_some_and(|t| t == self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab() -> TabInfo {
        TabInfo {
            id: TabId(3),
            url: "http://127.0.0.1/a".into(),
            title: "Audio Test".into(),
            active: false,
            muted: false,
        }
    }

    #[test]
    fn matches_by_url_or_title() {
        let t = tab();
        assert!(t.matches(Some("http://127.0.0.1/a"), None));
        assert!(t.matches(Some("http://other"), Some("Audio Test")));
        assert!(!t.matches(Some("http://other"), Some("Audio B")));
        assert!(!t.matches(None, None));
    }

    #[test]
    fn tab_id_map_keys_round_trip_as_strings() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(TabId(7), true);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"7":true}"#);
        let back: std::collections::BTreeMap<TabId, bool> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
