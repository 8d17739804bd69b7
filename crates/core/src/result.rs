//! Recorded operation timings.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::id::OperationId;
use crate::Time;

/// The measured outcome of one internal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    /// Measured duration, in milliseconds
    pub actual_ms: u64,

    /// When the operation was completed
    pub completed_at: Time,
}

impl OperationResult {
    /// Create a result.
    pub fn new(actual_ms: u64, completed_at: Time) -> Self {
        Self { actual_ms, completed_at }
    }
}

/// Results of the current session, keyed by operation.
pub type SessionResults = BTreeMap<OperationId, OperationResult>;

/// Snapshot of the most recent run in which every internal operation completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRun {
    /// When the run was promoted to history
    pub generated_at: Time,

    /// Results at completion time
    #[serde(default)]
    pub results: SessionResults,
}

impl LastRun {
    /// Create a snapshot.
    pub fn new(generated_at: Time, results: SessionResults) -> Self {
        Self { generated_at, results }
    }

    /// Result recorded for an operation, if any.
    pub fn result(&self, id: &OperationId) -> Option<&OperationResult> {
        self.results.get(id)
    }

    /// Drop the result of a removed operation.
    pub fn strip(&mut self, id: &OperationId) -> bool {
        self.results.remove(id).is_some()
    }
}
