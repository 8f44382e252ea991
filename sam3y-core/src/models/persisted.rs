use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::profile::Profile;
use super::tab::TabId;

/// The durable state document shared by every execution context.
///
/// Key names are part of the storage format:
/// `globalEnabled`, `tabEnabled`, `profile`, `mutedBySam3y`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub global_enabled: bool,
    pub tab_enabled: BTreeMap<TabId, bool>,
    pub profile: Profile,
    /// Tabs whose native mute was set by us, not by the user.
    #[serde(rename = "mutedBySam3y")]
    pub muted_by_sam3y: BTreeMap<TabId, bool>,
}

impl PersistedState {
    pub fn is_tab_enabled(&self, tab: TabId) -> bool {
        self.tab_enabled.get(&tab).copied().unwrap_or(false)
    }

    pub fn is_tracked_muted(&self, tab: TabId) -> bool {
        self.muted_by_sam3y.get(&tab).copied().unwrap_or(false)
    }

    pub fn tracked_muted_tabs(&self) -> Vec<TabId> {
        self.muted_by_sam3y
            .iter()
            .filter(|(_, muted)| **muted)
            .map(|(tab, _)| *tab)
            .collect()
    }

    /// Merge a patch, key by key. Absent keys are left untouched.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(global_enabled) = patch.global_enabled {
            self.global_enabled = global_enabled;
        }
        if let Some(tab_enabled) = patch.tab_enabled {
            self.tab_enabled = tab_enabled;
        }
        if let Some(profile) = patch.profile {
            self.profile = profile;
        }
        if let Some(muted) = patch.muted_by_sam3y {
            self.muted_by_sam3y = muted;
        }
    }
}

/// Partial update of [`PersistedState`]; each present key replaces the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatePatch {
    pub global_enabled: Option<bool>,
    pub tab_enabled: Option<BTreeMap<TabId, bool>>,
    pub profile: Option<Profile>,
    pub muted_by_sam3y: Option<BTreeMap<TabId, bool>>,
}

impl StatePatch {
    pub fn global_enabled(enabled: bool) -> Self {
        Self {
            global_enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn tab_enabled(map: BTreeMap<TabId, bool>) -> Self {
        Self {
            tab_enabled: Some(map),
            ..Default::default()
        }
    }

    pub fn profile(profile: Profile) -> Self {
        Self {
            profile: Some(profile),
            ..Default::default()
        }
    }

    pub fn muted_by_sam3y(map: BTreeMap<TabId, bool>) -> Self {
        Self {
            muted_by_sam3y: Some(map),
            ..Default::default()
        }
    }

    /// Every key set to its install-time default.
    pub fn defaults() -> Self {
        let d = PersistedState::default();
        Self {
            global_enabled: Some(d.global_enabled),
            tab_enabled: Some(d.tab_enabled),
            profile: Some(d.profile),
            muted_by_sam3y: Some(d.muted_by_sam3y),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.global_enabled.is_none()
            && self.tab_enabled.is_none()
            && self.profile.is_none()
            && self.muted_by_sam3y.is_none()
    }
}
