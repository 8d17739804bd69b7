//! Persisted state handed to the storage collaborator.

use serde::{Deserialize, Serialize};
use crate::config::ChangeoverConfig;
use crate::result::LastRun;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// What survives between sessions: the configuration and the last completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Snapshot format version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Changeover configuration
    pub config: ChangeoverConfig,

    /// Most recent completed run
    #[serde(default)]
    pub last_run: Option<LastRun>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl PersistedState {
    /// Create a snapshot at the current version.
    pub fn new(config: ChangeoverConfig, last_run: Option<LastRun>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            config,
            last_run,
        }
    }

    /// Demo configuration with its sample run.
    pub fn demo(now: crate::Time) -> Self {
        Self::new(ChangeoverConfig::demo(), Some(LastRun::sample(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_json_shape() {
        let state = PersistedState::demo(chrono::Utc::now());
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["version"], 1);
        assert!(value["config"]["operators"].is_array());
        assert!(value["config"]["phases"][0]["isExternal"].as_bool().unwrap());
        assert!(value["lastRun"]["results"]["p1_op1"]["actualMs"].is_u64());

        let back: PersistedState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_snapshot_without_last_run() {
        let json = r#"{ "config": { "operators": [], "phases": [] } }"#;
        let state: PersistedState = serde_json::from_str(json).unwrap();
        assert_eq!(state.version, SNAPSHOT_VERSION);
        assert!(state.last_run.is_none());
    }
}
