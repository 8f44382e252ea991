use parking_lot::Mutex;

use crate::models::error::StoreError;
use crate::models::persisted::{PersistedState, StatePatch};
use crate::traits::state_store::StateStore;

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<PersistedState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> PersistedState {
        self.state.lock().clone()
    }
}

impl StateStore for MemoryStore {
    async fn load(&self) -> Result<PersistedState, StoreError> {
        Ok(self.snapshot())
    }

    async fn apply(&self, patch: StatePatch) -> Result<(), StoreError> {
        self.state.lock().apply(patch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Profile;
    use crate::models::tab::TabId;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn patch_replaces_only_present_keys() {
        let store = MemoryStore::new();
        store
            .apply(StatePatch::tab_enabled(BTreeMap::from([(TabId(7), true)])))
            .await
            .unwrap();
        store.apply(StatePatch::profile(Profile::Best)).await.unwrap();

        let state = store.load().await.unwrap();
        assert!(state.is_tab_enabled(TabId(7)));
        assert_eq!(state.profile, Profile::Best);
        assert!(!state.global_enabled);
    }

    #[tokio::test]
    async fn defaults_patch_resets() {
        let mut seeded = PersistedState::default();
        seeded.global_enabled = true;
        seeded.muted_by_sam3y.insert(TabId(1), true);
        let store = MemoryStore::with_state(seeded);

        store.apply(StatePatch::defaults()).await.unwrap();
        assert_eq!(store.snapshot(), PersistedState::default());
    }
}
