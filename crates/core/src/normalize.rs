//! Load-time normalization of configurations.
//!
//! Stored or hand-edited configurations may be incomplete. Normalization
//! repairs them in place so that every id is present and unique and every
//! operation resolves to an existing operator.

use std::collections::HashSet;
use tracing::debug;
use crate::config::ChangeoverConfig;
use crate::id::{OperationId, OperatorId, PhaseId};
use crate::phase::Operator;

/// A repair applied by [`ChangeoverConfig::normalize`].
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationFix {
    /// The team was empty; a default operator was added
    AddedDefaultOperator(OperatorId),
    /// Operator id was missing or duplicated
    OperatorId {
        /// Position in the team
        index: usize,
        /// Id assigned
        id: OperatorId,
    },
    /// Operator name was blank
    OperatorName(OperatorId),
    /// Phase id was missing or duplicated
    PhaseId {
        /// Position in the phase list
        index: usize,
        /// Id assigned
        id: PhaseId,
    },
    /// Phase name was blank
    PhaseName(PhaseId),
    /// More than one external phase; this one was made internal
    ExtraExternalPhase(PhaseId),
    /// Operation id was missing or duplicated
    OperationId {
        /// Owning phase
        phase: PhaseId,
        /// Id assigned
        id: OperationId,
    },
    /// Operation label was blank
    OperationLabel(OperationId),
    /// Target was negative or not a number
    OperationTarget(OperationId),
    /// Operator reference did not resolve
    OperationOperator {
        /// Repaired operation
        operation: OperationId,
        /// Operator it was assigned to
        fallback: OperatorId,
    },
}

impl ChangeoverConfig {
    /// Repair the configuration in place, returning what was changed.
    pub fn normalize(&mut self) -> Vec<NormalizationFix> {
        let mut fixes = Vec::new();

        // Operators
        let mut seen = HashSet::new();
        for (index, operator) in self.operators.iter_mut().enumerate() {
            if operator.id.is_blank() || seen.contains(&operator.id) {
                let fresh = if operator.id.is_blank() && !seen.contains(&OperatorId::new(format!("op{}", index + 1))) {
                    OperatorId::new(format!("op{}", index + 1))
                } else {
                    OperatorId::generate()
                };
                operator.id = fresh.clone();
                fixes.push(NormalizationFix::OperatorId { index, id: fresh });
            }
            seen.insert(operator.id.clone());
            if operator.name.trim().is_empty() {
                operator.name = format!("Operator {}", index + 1);
                fixes.push(NormalizationFix::OperatorName(operator.id.clone()));
            }
        }
        if self.operators.is_empty() {
            let id = OperatorId::new("op1");
            self.operators.push(Operator::new(id.clone(), "Operator 1"));
            fixes.push(NormalizationFix::AddedDefaultOperator(id));
        }
        let fallback = self.operators[0].id.clone();
        let operator_ids: HashSet<OperatorId> =
            self.operators.iter().map(|op| op.id.clone()).collect();

        // Phases and operations
        let mut phase_ids = HashSet::new();
        let mut operation_ids = HashSet::new();
        let mut external_seen = false;
        for (index, phase) in self.phases.iter_mut().enumerate() {
            if phase.id.is_blank() || phase_ids.contains(&phase.id) {
                let fresh = if phase.id.is_blank() && !phase_ids.contains(&PhaseId::new(format!("phase_{}", index + 1))) {
                    PhaseId::new(format!("phase_{}", index + 1))
                } else {
                    PhaseId::generate()
                };
                phase.id = fresh.clone();
                fixes.push(NormalizationFix::PhaseId { index, id: fresh });
            }
            phase_ids.insert(phase.id.clone());
            if phase.name.trim().is_empty() {
                phase.name = format!("Phase {}", index + 1);
                fixes.push(NormalizationFix::PhaseName(phase.id.clone()));
            }
            if phase.is_external {
                if external_seen {
                    phase.is_external = false;
                    fixes.push(NormalizationFix::ExtraExternalPhase(phase.id.clone()));
                }
                external_seen = true;
            }

            for (op_index, operation) in phase.operations.iter_mut().enumerate() {
                if operation.id.is_blank() || operation_ids.contains(&operation.id) {
                    operation.id = OperationId::generate();
                    fixes.push(NormalizationFix::OperationId {
                        phase: phase.id.clone(),
                        id: operation.id.clone(),
                    });
                }
                operation_ids.insert(operation.id.clone());
                if operation.label.trim().is_empty() {
                    operation.label = format!("Operation {}", op_index + 1);
                    fixes.push(NormalizationFix::OperationLabel(operation.id.clone()));
                }
                if !operation.target_minutes.is_finite() || operation.target_minutes < 0.0 {
                    operation.target_minutes = 0.0;
                    fixes.push(NormalizationFix::OperationTarget(operation.id.clone()));
                }
                if !operator_ids.contains(&operation.operator_id) {
                    operation.operator_id = fallback.clone();
                    fixes.push(NormalizationFix::OperationOperator {
                        operation: operation.id.clone(),
                        fallback: fallback.clone(),
                    });
                }
            }
        }

        for fix in &fixes {
            debug!("Normalized configuration: {:?}", fix);
        }
        fixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{Operation, Phase};

    #[test]
    fn test_normalize_fills_missing_fields() {
        let json = r#"{
            "operators": [{ "name": "Anna" }, { "id": "op2" }],
            "phases": [{
                "operations": [
                    { "label": "Secure area", "operatorId": "ghost", "targetMinutes": 3 },
                    { "operatorId": "op2", "targetMinutes": -4 }
                ]
            }]
        }"#;
        let mut config: ChangeoverConfig = serde_json::from_str(json).unwrap();
        let fixes = config.normalize();

        assert_eq!(config.operators[0].id.as_str(), "op1");
        assert_eq!(config.operators[1].name, "Operator 2");
        assert_eq!(config.phases[0].id.as_str(), "phase_1");
        assert_eq!(config.phases[0].name, "Phase 1");

        let ops = &config.phases[0].operations;
        assert!(!ops[0].id.is_blank());
        assert_ne!(ops[0].id, ops[1].id);
        assert_eq!(ops[0].operator_id.as_str(), "op1");
        assert_eq!(ops[1].label, "Operation 2");
        assert_eq!(ops[1].target_minutes, 0.0);
        assert!(fixes.contains(&NormalizationFix::OperationOperator {
            operation: ops[0].id.clone(),
            fallback: "op1".into(),
        }));
        assert!(fixes.contains(&NormalizationFix::OperatorId { index: 0, id: "op1".into() }));
        assert!(fixes.contains(&NormalizationFix::PhaseId { index: 0, id: "phase_1".into() }));
        for op in ops {
            assert!(fixes.contains(&NormalizationFix::OperationId {
                phase: "phase_1".into(),
                id: op.id.clone(),
            }));
        }
    }

    #[test]
    fn test_normalize_adds_operator_to_empty_team() {
        let mut config = ChangeoverConfig::new(
            vec![],
            vec![Phase::new("p1", "Stop").with_operation(Operation::new("a", "A", "op9", 1.0))],
        );
        config.normalize();
        assert_eq!(config.operators.len(), 1);
        assert_eq!(config.phases[0].operations[0].operator_id.as_str(), "op1");
    }

    #[test]
    fn test_normalize_keeps_single_external_phase() {
        let mut config = ChangeoverConfig::new(
            vec![Operator::new("op1", "Anna")],
            vec![
                Phase::new("a", "A").external(),
                Phase::new("b", "B").external(),
            ],
        );
        let fixes = config.normalize();
        assert!(config.phases[0].is_external);
        assert!(!config.phases[1].is_external);
        assert_eq!(fixes, vec![NormalizationFix::ExtraExternalPhase("b".into())]);
    }

    #[test]
    fn test_normalize_regenerates_duplicate_operation_ids() {
        let mut config = ChangeoverConfig::new(
            vec![Operator::new("op1", "Anna")],
            vec![Phase::new("p1", "Stop")
                .with_operation(Operation::new("x", "A", "op1", 1.0))
                .with_operation(Operation::new("x", "B", "op1", 1.0))],
        );
        config.normalize();
        let ops = &config.phases[0].operations;
        assert_eq!(ops[0].id.as_str(), "x");
        assert_ne!(ops[1].id.as_str(), "x");
    }

    #[test]
    fn test_normalize_is_noop_on_clean_config() {
        let mut config = ChangeoverConfig::demo();
        assert!(config.normalize().is_empty());
    }
}
