//! Preparation checklist for the external phase.

use std::collections::BTreeMap;
use serde::Serialize;
use smed_core::{ChangeoverConfig, OperationId};

/// Readiness of each preparation operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreparationStatus {
    ready: BTreeMap<OperationId, bool>,
}

/// Count of ready preparation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreparationProgress {
    /// Operations marked ready
    pub ready: usize,

    /// Operations in the external phase
    pub total: usize,
}

impl PreparationProgress {
    /// True when nothing is left to prepare.
    pub fn is_complete(&self) -> bool {
        self.ready >= self.total
    }
}

impl PreparationStatus {
    /// All preparation operations of `config`, none ready.
    pub fn from_config(config: &ChangeoverConfig) -> Self {
        let mut status = Self::default();
        status.reset(config);
        status
    }

    /// Mark every preparation operation as not ready.
    pub fn reset(&mut self, config: &ChangeoverConfig) {
        self.ready = config
            .external_phase()
            .map(|phase| {
                phase
                    .operations
                    .iter()
                    .map(|op| (op.id.clone(), false))
                    .collect()
            })
            .unwrap_or_default();
    }

    /// Whether an operation is marked ready.
    pub fn is_ready(&self, id: &OperationId) -> bool {
        self.ready.get(id).copied().unwrap_or(false)
    }

    /// Set the flag of an operation.
    pub fn set(&mut self, id: OperationId, ready: bool) {
        self.ready.insert(id, ready);
    }

    /// Forget a removed operation.
    pub fn remove(&mut self, id: &OperationId) {
        self.ready.remove(id);
    }

    /// Progress over the current external phase.
    pub fn progress(&self, config: &ChangeoverConfig) -> PreparationProgress {
        let Some(phase) = config.external_phase() else {
            return PreparationProgress { ready: 0, total: 0 };
        };
        PreparationProgress {
            ready: phase.operations.iter().filter(|op| self.is_ready(&op.id)).count(),
            total: phase.operations.len(),
        }
    }

    /// Preparation operations not yet ready, in configuration order.
    pub fn pending(&self, config: &ChangeoverConfig) -> Vec<OperationId> {
        config
            .external_phase()
            .map(|phase| {
                phase
                    .operations
                    .iter()
                    .filter(|op| !self.is_ready(&op.id))
                    .map(|op| op.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_over_demo_preparation() {
        let config = ChangeoverConfig::demo();
        let mut status = PreparationStatus::from_config(&config);
        assert_eq!(status.progress(&config), PreparationProgress { ready: 0, total: 3 });

        status.set("prep_op1".into(), true);
        status.set("prep_op3".into(), true);
        let progress = status.progress(&config);
        assert_eq!(progress.ready, 2);
        assert!(!progress.is_complete());
        assert_eq!(status.pending(&config), vec![OperationId::from("prep_op2")]);

        status.reset(&config);
        assert!(!status.is_ready(&"prep_op1".into()));
    }

    #[test]
    fn test_no_external_phase_is_complete() {
        let mut config = ChangeoverConfig::demo();
        config.set_external_phase(None).unwrap();
        let status = PreparationStatus::from_config(&config);
        assert!(status.progress(&config).is_complete());
        assert!(status.pending(&config).is_empty());
    }
}
