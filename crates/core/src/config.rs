//! Changeover configuration - the ordered team, phases and operations.

use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::ConfigError;
use crate::id::{OperationId, OperatorId, PhaseId};
use crate::phase::{Operation, OperationRef, Operator, Phase};

/// Name used when an operator reference cannot be resolved.
const UNKNOWN_OPERATOR_NAME: &str = "Operator";

/// Default label for new operations.
const NEW_OPERATION_LABEL: &str = "New operation";

/// Default target for new operations, in minutes.
const NEW_OPERATION_TARGET: f64 = 1.0;

/// Bounds on the size of the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLimits {
    /// Maximum number of operators
    pub max_operators: usize,

    /// Minimum number of operators
    pub min_operators: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_operators: 4,
            min_operators: 1,
        }
    }
}

/// Partial update for an operation. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationPatch {
    /// New label
    pub label: Option<String>,

    /// New assigned operator
    pub operator_id: Option<OperatorId>,

    /// New target, in minutes
    pub target_minutes: Option<f64>,
}

/// The full changeover configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeoverConfig {
    /// Team members, in display order
    #[serde(default)]
    pub operators: Vec<Operator>,

    /// Phases, in display order
    #[serde(default)]
    pub phases: Vec<Phase>,
}

impl ChangeoverConfig {
    /// Create a configuration.
    pub fn new(operators: Vec<Operator>, phases: Vec<Phase>) -> Self {
        Self { operators, phases }
    }

    // === Queries ===

    /// Look up an operator.
    pub fn operator(&self, id: &OperatorId) -> Option<&Operator> {
        self.operators.iter().find(|op| &op.id == id)
    }

    /// Display name of an operator, with a generic fallback.
    pub fn operator_name(&self, id: &OperatorId) -> &str {
        self.operator(id)
            .map(|op| op.name.as_str())
            .unwrap_or(UNKNOWN_OPERATOR_NAME)
    }

    /// Look up a phase.
    pub fn phase(&self, id: &PhaseId) -> Option<&Phase> {
        self.phases.iter().find(|phase| &phase.id == id)
    }

    /// The preparation phase, if any.
    pub fn external_phase(&self) -> Option<&Phase> {
        self.phases.iter().find(|phase| phase.is_external)
    }

    /// Phases that are timed during the run.
    pub fn internal_phases(&self) -> impl Iterator<Item = &Phase> {
        self.phases.iter().filter(|phase| !phase.is_external)
    }

    /// Every operation, in phase order then operation order.
    pub fn operations(&self) -> impl Iterator<Item = OperationRef<'_>> {
        self.phases.iter().flat_map(|phase| {
            phase
                .operations
                .iter()
                .map(move |operation| OperationRef { phase, operation })
        })
    }

    /// Operations belonging to non-external phases.
    pub fn internal_operations(&self) -> impl Iterator<Item = OperationRef<'_>> {
        self.operations().filter(|op| op.is_internal())
    }

    /// The ordered internal operations assigned to one operator.
    ///
    /// The order is configuration order; targets never reorder the sequence.
    pub fn operator_sequence(&self, operator_id: &OperatorId) -> Vec<OperationRef<'_>> {
        self.internal_operations()
            .filter(|op| &op.operation.operator_id == operator_id)
            .collect()
    }

    /// Find an operation anywhere in the configuration.
    pub fn find_operation(&self, id: &OperationId) -> Option<OperationRef<'_>> {
        self.operations().find(|op| op.id() == id)
    }

    /// Sum of targets over all internal operations, in minutes.
    pub fn internal_target_minutes(&self) -> f64 {
        self.internal_phases().map(Phase::target_minutes).sum()
    }

    // === Edits ===

    /// Append an operator with a generated id and a default name.
    pub fn add_operator(&mut self, limits: &ConfigLimits) -> Result<OperatorId, ConfigError> {
        if self.operators.len() >= limits.max_operators {
            return Err(ConfigError::OperatorLimit { max: limits.max_operators });
        }
        let id = OperatorId::generate();
        let name = format!("Operator {}", self.operators.len() + 1);
        debug!("Adding operator {} ({})", id, name);
        self.operators.push(Operator::new(id.clone(), name));
        Ok(id)
    }

    /// Remove an operator, reassigning its operations to the first remaining one.
    ///
    /// Returns the ids of the reassigned operations.
    pub fn remove_operator(
        &mut self,
        id: &OperatorId,
        limits: &ConfigLimits,
    ) -> Result<Vec<OperationId>, ConfigError> {
        if self.operator(id).is_none() {
            return Err(ConfigError::UnknownOperator(id.clone()));
        }
        if self.operators.len() <= limits.min_operators.max(1) {
            return Err(ConfigError::LastOperator { min: limits.min_operators.max(1) });
        }

        self.operators.retain(|op| &op.id != id);
        let fallback = self.operators[0].id.clone();

        let mut reassigned = Vec::new();
        for phase in &mut self.phases {
            for operation in &mut phase.operations {
                if &operation.operator_id == id {
                    operation.operator_id = fallback.clone();
                    reassigned.push(operation.id.clone());
                }
            }
        }

        debug!(
            "Removed operator {}, reassigned {} operation(s) to {}",
            id,
            reassigned.len(),
            fallback
        );
        Ok(reassigned)
    }

    /// Rename an operator. A blank name keeps the current one.
    pub fn rename_operator(&mut self, id: &OperatorId, name: &str) -> Result<(), ConfigError> {
        let operator = self
            .operators
            .iter_mut()
            .find(|op| &op.id == id)
            .ok_or_else(|| ConfigError::UnknownOperator(id.clone()))?;
        if !name.trim().is_empty() {
            operator.name = name.to_string();
        }
        Ok(())
    }

    /// Append an operation to a phase.
    ///
    /// Missing fields default to a generic label, the first operator and a
    /// one-minute target.
    pub fn add_operation(
        &mut self,
        phase_id: &PhaseId,
        patch: OperationPatch,
    ) -> Result<OperationId, ConfigError> {
        self.validate_patch(&patch)?;
        let operator_id = match patch.operator_id {
            Some(id) => id,
            None => self
                .operators
                .first()
                .map(|op| op.id.clone())
                .ok_or_else(|| ConfigError::UnknownOperator(OperatorId::default()))?,
        };
        let phase = self
            .phases
            .iter_mut()
            .find(|phase| &phase.id == phase_id)
            .ok_or_else(|| ConfigError::UnknownPhase(phase_id.clone()))?;

        let id = OperationId::generate();
        phase.operations.push(Operation::new(
            id.clone(),
            patch.label.unwrap_or_else(|| NEW_OPERATION_LABEL.to_string()),
            operator_id,
            patch.target_minutes.unwrap_or(NEW_OPERATION_TARGET),
        ));
        Ok(id)
    }

    /// Remove an operation, returning it.
    pub fn remove_operation(&mut self, id: &OperationId) -> Result<Operation, ConfigError> {
        for phase in &mut self.phases {
            if let Some(index) = phase.operations.iter().position(|op| &op.id == id) {
                return Ok(phase.operations.remove(index));
            }
        }
        Err(ConfigError::UnknownOperation(id.clone()))
    }

    /// Move an operation within its phase. The destination is clamped to the phase.
    pub fn move_operation(
        &mut self,
        phase_id: &PhaseId,
        from: usize,
        to: usize,
    ) -> Result<(), ConfigError> {
        let phase = self
            .phases
            .iter_mut()
            .find(|phase| &phase.id == phase_id)
            .ok_or_else(|| ConfigError::UnknownPhase(phase_id.clone()))?;
        let len = phase.operations.len();
        if from >= len {
            return Err(ConfigError::IndexOutOfRange {
                phase: phase_id.clone(),
                index: from,
                len,
            });
        }
        let to = to.min(len - 1);
        if from != to {
            let item = phase.operations.remove(from);
            phase.operations.insert(to, item);
        }
        Ok(())
    }

    /// Apply a partial update to an operation.
    pub fn update_operation(
        &mut self,
        id: &OperationId,
        patch: OperationPatch,
    ) -> Result<(), ConfigError> {
        self.validate_patch(&patch)?;
        let operation = self
            .phases
            .iter_mut()
            .flat_map(|phase| phase.operations.iter_mut())
            .find(|op| &op.id == id)
            .ok_or_else(|| ConfigError::UnknownOperation(id.clone()))?;

        if let Some(label) = patch.label {
            operation.label = label;
        }
        if let Some(operator_id) = patch.operator_id {
            operation.operator_id = operator_id;
        }
        if let Some(target) = patch.target_minutes {
            operation.target_minutes = target;
        }
        Ok(())
    }

    /// Select the preparation phase (`None` clears it).
    ///
    /// Returns `true` when the external phase actually changed.
    pub fn set_external_phase(&mut self, phase_id: Option<&PhaseId>) -> Result<bool, ConfigError> {
        if let Some(id) = phase_id {
            if self.phase(id).is_none() {
                return Err(ConfigError::UnknownPhase(id.clone()));
            }
        }
        let before = self.external_phase().map(|phase| phase.id.clone());
        for phase in &mut self.phases {
            phase.is_external = Some(&phase.id) == phase_id;
        }
        Ok(before.as_ref() != phase_id)
    }

    fn validate_patch(&self, patch: &OperationPatch) -> Result<(), ConfigError> {
        if let Some(target) = patch.target_minutes {
            if !target.is_finite() || target < 0.0 {
                return Err(ConfigError::InvalidTarget(target));
            }
        }
        if let Some(operator_id) = &patch.operator_id {
            if self.operator(operator_id).is_none() {
                return Err(ConfigError::UnknownOperator(operator_id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChangeoverConfig {
        ChangeoverConfig::new(
            vec![Operator::new("op1", "Anna"), Operator::new("op2", "Bruno")],
            vec![
                Phase::new("prep", "Preparation")
                    .external()
                    .with_operation(Operation::new("prep_a", "Gather tooling", "op1", 5.0)),
                Phase::new("p1", "Stop line")
                    .with_operation(Operation::new("p1_a", "Secure area", "op1", 3.0))
                    .with_operation(Operation::new("p1_b", "Drain circuits", "op2", 6.0))
                    .with_operation(Operation::new("p1_c", "Lock energy", "op1", 4.0)),
                Phase::new("p2", "Mount format")
                    .with_operation(Operation::new("p2_a", "Install tooling", "op2", 7.0)),
            ],
        )
    }

    #[test]
    fn test_operator_sequence_follows_configuration_order() {
        let config = sample();
        let seq: Vec<_> = config
            .operator_sequence(&"op1".into())
            .iter()
            .map(|op| op.id().as_str().to_string())
            .collect();
        assert_eq!(seq, vec!["p1_a", "p1_c"]);
    }

    #[test]
    fn test_internal_operations_skip_external_phase() {
        let config = sample();
        assert_eq!(config.internal_operations().count(), 4);
        assert!(config.find_operation(&"prep_a".into()).is_some());
        assert!((config.internal_target_minutes() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_remove_operator_reassigns_to_first_remaining() {
        let mut config = sample();
        let reassigned = config
            .remove_operator(&"op1".into(), &ConfigLimits::default())
            .unwrap();
        assert_eq!(reassigned.len(), 3);
        for op in config.operations() {
            assert!(config.operator(&op.operation.operator_id).is_some());
            assert_eq!(op.operation.operator_id.as_str(), "op2");
        }
    }

    #[test]
    fn test_remove_last_operator_rejected() {
        let mut config = sample();
        let limits = ConfigLimits::default();
        config.remove_operator(&"op2".into(), &limits).unwrap();
        let err = config.remove_operator(&"op1".into(), &limits).unwrap_err();
        assert_eq!(err, ConfigError::LastOperator { min: 1 });
        assert_eq!(config.operators.len(), 1);
    }

    #[test]
    fn test_add_operator_respects_limit() {
        let mut config = sample();
        let limits = ConfigLimits::default();
        config.add_operator(&limits).unwrap();
        let id = config.add_operator(&limits).unwrap();
        assert_eq!(config.operator_name(&id), "Operator 4");
        assert_eq!(
            config.add_operator(&limits).unwrap_err(),
            ConfigError::OperatorLimit { max: 4 }
        );
    }

    #[test]
    fn test_rename_operator_ignores_blank_name() {
        let mut config = sample();
        config.rename_operator(&"op1".into(), "  ").unwrap();
        assert_eq!(config.operator_name(&"op1".into()), "Anna");
        config.rename_operator(&"op1".into(), "Chloé").unwrap();
        assert_eq!(config.operator_name(&"op1".into()), "Chloé");
        assert_eq!(config.operator_name(&"nobody".into()), "Operator");
    }

    #[test]
    fn test_add_operation_defaults() {
        let mut config = sample();
        let id = config.add_operation(&"p2".into(), OperationPatch::default()).unwrap();
        let op = config.find_operation(&id).unwrap().operation;
        assert_eq!(op.label, "New operation");
        assert_eq!(op.operator_id.as_str(), "op1");
        assert!((op.target_minutes - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_operation_validates_before_mutating() {
        let mut config = sample();
        let patch = OperationPatch {
            label: Some("Renamed".into()),
            target_minutes: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(
            config.update_operation(&"p1_a".into(), patch).unwrap_err(),
            ConfigError::InvalidTarget(-1.0)
        );
        assert_eq!(config.find_operation(&"p1_a".into()).unwrap().operation.label, "Secure area");

        let patch = OperationPatch {
            operator_id: Some("ghost".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.update_operation(&"p1_a".into(), patch),
            Err(ConfigError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_move_operation_clamps_destination() {
        let mut config = sample();
        config.move_operation(&"p1".into(), 0, 10).unwrap();
        let labels: Vec<_> = config.phase(&"p1".into()).unwrap()
            .operations.iter().map(|op| op.id.as_str()).collect();
        assert_eq!(labels, vec!["p1_b", "p1_c", "p1_a"]);
        assert!(config.move_operation(&"p1".into(), 3, 0).is_err());
    }

    #[test]
    fn test_set_external_phase_keeps_at_most_one() {
        let mut config = sample();
        assert!(config.set_external_phase(Some(&"p2".into())).unwrap());
        assert_eq!(config.phases.iter().filter(|p| p.is_external).count(), 1);
        assert_eq!(config.external_phase().unwrap().id.as_str(), "p2");
        assert!(!config.set_external_phase(Some(&"p2".into())).unwrap());
        assert!(config.set_external_phase(None).unwrap());
        assert!(config.external_phase().is_none());
    }
}
