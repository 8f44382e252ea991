use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::models::error::StoreError;
use crate::models::persisted::{PersistedState, StatePatch};
use crate::traits::state_store::StateStore;

/// Durable store backed by one pretty-printed JSON document.
///
/// A missing file reads as the default state. Writes go to a sibling temp
/// file that is then renamed over the target, so readers never see a torn
/// document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read(&self) -> Result<PersistedState, StoreError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PersistedState::default()),
            Err(e) => {
                return Err(StoreError::Read(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        if json.trim().is_empty() {
            return Ok(PersistedState::default());
        }
        serde_json::from_str(&json).map_err(|e| {
            StoreError::Corrupt(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    async fn write(&self, state: &PersistedState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| StoreError::Write(format!("failed to serialize state: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Write(format!("failed to create {}: {}", parent.display(), e)))?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Write(format!("failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            StoreError::Write(format!("failed to replace {}: {}", self.path.display(), e))
        })
    }
}

impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<PersistedState, StoreError> {
        self.read().await
    }

    async fn apply(&self, patch: StatePatch) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.read().await?;
        state.apply(patch);
        self.write(&state).await?;
        log::debug!("state written to {}", self.path.display());
        Ok(())
    }
}
