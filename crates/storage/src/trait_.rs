//! Storage trait abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use smed_core::{PersistedState, Time};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot written by a newer version
    #[error("Unsupported snapshot version {found} (supported up to {supported})")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Marker written next to each saved snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMeta {
    /// Number of saves so far
    pub revision: u64,

    /// Time of the last save
    pub updated_at: Time,
}

/// Storage abstraction for the persisted changeover state.
///
/// The stored value is opaque to the backend: a configuration and the last
/// completed run.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load the stored state, `None` when nothing was saved yet.
    async fn load_state(&self) -> Result<Option<PersistedState>>;

    /// Replace the stored state and return the new meta marker.
    async fn save_state(&mut self, state: &PersistedState) -> Result<StateMeta>;

    /// Meta marker of the last save, if any.
    async fn load_meta(&self) -> Result<Option<StateMeta>>;
}

/// Load the stored state, falling back to the demo configuration.
///
/// A missing or unreadable snapshot yields the demo configuration with its
/// sample run; the returned configuration is always normalized.
pub async fn load_or_default<S: Storage + ?Sized>(storage: &S, now: Time) -> PersistedState {
    match storage.load_state().await {
        Ok(Some(mut state)) => {
            let fixes = state.config.normalize();
            if !fixes.is_empty() {
                debug!("Stored configuration normalized: {:?}", fixes);
            }
            state
        }
        Ok(None) => {
            info!("No stored state, starting from the demo configuration");
            PersistedState::demo(now)
        }
        Err(e) => {
            warn!("Stored state unreadable, using the demo configuration: {}", e);
            PersistedState::demo(now)
        }
    }
}
