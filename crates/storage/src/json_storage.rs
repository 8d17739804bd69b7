//! JSON file storage implementation.
//!
//! Stores the state as `state.json` in the data directory and keeps a small
//! meta marker (revision + updatedAt) in `state.meta.json`. Writes go to a
//! temporary file first and are renamed into place.

use std::path::{Path, PathBuf};
use smed_core::{PersistedState, SNAPSHOT_VERSION};
use tokio::fs;
use tracing::{debug, info};
use super::{Result, StateMeta, Storage, StorageError};

const STATE_FILE: &str = "state.json";
const META_FILE: &str = "state.meta.json";

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage, creating the data directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    fn meta_path(&self) -> PathBuf {
        self.root.join(META_FILE)
    }

    /// Read and increment the revision, return the new marker.
    async fn bump_revision(&self) -> Result<StateMeta> {
        let revision = match read_json::<StateMeta>(&self.meta_path()).await {
            Ok(Some(meta)) => meta.revision,
            // an unreadable marker restarts the count
            Ok(None) | Err(_) => 0,
        };
        let meta = StateMeta {
            revision: revision + 1,
            updated_at: chrono::Utc::now(),
        };
        write_atomic(&self.meta_path(), serde_json::to_string_pretty(&meta)?.as_bytes()).await?;
        Ok(meta)
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn load_state(&self) -> Result<Option<PersistedState>> {
        let state: Option<PersistedState> = read_json(&self.state_path()).await?;
        if let Some(state) = &state {
            if state.version > SNAPSHOT_VERSION {
                return Err(StorageError::UnsupportedVersion {
                    found: state.version,
                    supported: SNAPSHOT_VERSION,
                });
            }
            debug!("Loaded state from {}", self.state_path().display());
        }
        Ok(state)
    }

    async fn save_state(&mut self, state: &PersistedState) -> Result<StateMeta> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.state_path(), json.as_bytes()).await?;

        let meta = self.bump_revision().await?;
        info!("Saved state revision {}", meta.revision);
        Ok(meta)
    }

    async fn load_meta(&self) -> Result<Option<StateMeta>> {
        read_json(&self.meta_path()).await
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_or_default;
    use smed_core::{ChangeoverConfig, LastRun, OperationResult, SessionResults};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_state_loads_demo() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();

        assert!(storage.load_state().await.unwrap().is_none());
        let now = chrono::Utc::now();
        let state = load_or_default(&storage, now).await;
        assert_eq!(state.config, ChangeoverConfig::demo());
        assert_eq!(state.last_run, Some(LastRun::sample(now)));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut results = SessionResults::new();
        results.insert("p1_op1".into(), OperationResult::new(240_000, chrono::Utc::now()));
        let state = PersistedState::new(
            ChangeoverConfig::demo(),
            Some(LastRun::new(chrono::Utc::now(), results)),
        );

        let meta = storage.save_state(&state).await.unwrap();
        assert_eq!(meta.revision, 1);
        assert_eq!(storage.load_state().await.unwrap(), Some(state.clone()));

        let meta = storage.save_state(&state).await.unwrap();
        assert_eq!(meta.revision, 2);
        assert_eq!(storage.load_meta().await.unwrap(), Some(meta));
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_invalid_file_falls_back_to_demo() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("state.json"), "{ not json").unwrap();

        assert!(matches!(storage.load_state().await, Err(StorageError::Json(_))));
        let state = load_or_default(&storage, chrono::Utc::now()).await;
        assert_eq!(state.config, ChangeoverConfig::demo());
    }

    #[tokio::test]
    async fn test_newer_version_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let mut value = serde_json::to_value(PersistedState::new(ChangeoverConfig::demo(), None)).unwrap();
        value["version"] = serde_json::json!(SNAPSHOT_VERSION + 1);
        std::fs::write(dir.path().join("state.json"), value.to_string()).unwrap();

        assert!(matches!(
            storage.load_state().await,
            Err(StorageError::UnsupportedVersion { .. })
        ));
    }

    #[tokio::test]
    async fn test_loaded_config_is_normalized() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let raw = r#"{
            "config": {
                "operators": [],
                "phases": [
                    { "id": "p1", "name": "Stop", "operations": [
                        { "id": "a", "label": "Open", "operatorId": "ghost", "targetMinutes": -3 }
                    ] }
                ]
            }
        }"#;
        std::fs::write(dir.path().join("state.json"), raw).unwrap();

        let state = load_or_default(&storage, chrono::Utc::now()).await;
        assert_eq!(state.config.operators.len(), 1);
        let op = &state.config.phases[0].operations[0];
        assert_eq!(op.operator_id, state.config.operators[0].id);
        assert_eq!(op.target_minutes, 0.0);
        assert!(state.last_run.is_none());
    }
}
