//! Demonstration data used when nothing has been stored yet.

use crate::config::ChangeoverConfig;
use crate::phase::{Operation, Operator, Phase};
use crate::result::{LastRun, OperationResult, SessionResults};
use crate::{minutes_to_ms, Time};

impl ChangeoverConfig {
    /// A three-operator changeover with a preparation phase and three timed phases.
    pub fn demo() -> Self {
        let operators = vec![
            Operator::new("op1", "Operator 1"),
            Operator::new("op2", "Operator 2"),
            Operator::new("op3", "Operator 3"),
        ];

        let phases = vec![
            Phase::new("prep", "Changeover preparation")
                .external()
                .with_operation(Operation::new("prep_op1", "Gather the dedicated tooling", "op1", 5.0))
                .with_operation(Operation::new("prep_op2", "Prepare the routing documents", "op2", 4.0))
                .with_operation(Operation::new("prep_op3", "Check material availability", "op3", 6.0)),
            Phase::new("p1", "Phase 1 - Line stop")
                .with_operation(Operation::new("p1_op1", "Brief the team and secure the area", "op1", 3.0))
                .with_operation(Operation::new("p1_op2", "Drain the active circuits", "op2", 6.0))
                .with_operation(Operation::new("p1_op3", "Remove worn parts", "op3", 5.0))
                .with_operation(Operation::new("p1_op4", "Verify energy lockout", "op1", 4.0)),
            Phase::new("p2", "Phase 2 - New format setup")
                .with_operation(Operation::new("p2_op1", "Install the format tooling", "op1", 7.0))
                .with_operation(Operation::new("p2_op2", "Apply machine settings", "op2", 8.0))
                .with_operation(Operation::new("p2_op3", "Refit the safety guards", "op3", 5.0))
                .with_operation(Operation::new("p2_op4", "Reconnect the supplies", "op2", 6.0)),
            Phase::new("p3", "Phase 3 - Production restart")
                .with_operation(Operation::new("p3_op1", "Run the quality checks", "op1", 6.0))
                .with_operation(Operation::new("p3_op2", "Validate production trials", "op2", 5.0))
                .with_operation(Operation::new("p3_op3", "Update the tracking documents", "op3", 4.0))
                .with_operation(Operation::new("p3_op4", "Announce the restart to the team", "op1", 3.0)),
        ];

        Self::new(operators, phases)
    }
}

impl LastRun {
    /// Sample results matching [`ChangeoverConfig::demo`].
    pub fn sample(generated_at: Time) -> Self {
        let minutes = [
            ("p1_op1", 3.2),
            ("p1_op2", 6.6),
            ("p1_op3", 5.5),
            ("p1_op4", 3.8),
            ("p2_op1", 7.5),
            ("p2_op2", 9.1),
            ("p2_op3", 4.3),
            ("p2_op4", 6.2),
            ("p3_op1", 6.4),
            ("p3_op2", 5.6),
            ("p3_op3", 4.5),
            ("p3_op4", 3.1),
        ];
        let results: SessionResults = minutes
            .iter()
            .map(|(id, min)| ((*id).into(), OperationResult::new(minutes_to_ms(*min), generated_at)))
            .collect();
        Self::new(generated_at, results)
    }
}
