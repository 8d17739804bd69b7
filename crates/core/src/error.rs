//! Configuration errors.

use crate::id::{OperationId, OperatorId, PhaseId};

/// Errors raised by configuration edits.
///
/// None of these leave the configuration half-modified: every edit validates
/// its inputs before touching any field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Operator does not exist
    #[error("Unknown operator: {0}")]
    UnknownOperator(OperatorId),

    /// Phase does not exist
    #[error("Unknown phase: {0}")]
    UnknownPhase(PhaseId),

    /// Operation does not exist
    #[error("Unknown operation: {0}")]
    UnknownOperation(OperationId),

    /// Too many operators
    #[error("At most {max} operators are allowed")]
    OperatorLimit {
        /// Configured maximum
        max: usize,
    },

    /// Removal would leave too few operators
    #[error("At least {min} operator(s) must remain")]
    LastOperator {
        /// Configured minimum
        min: usize,
    },

    /// Position outside the phase
    #[error("Index {index} is out of range for phase {phase} ({len} operations)")]
    IndexOutOfRange {
        /// Phase being edited
        phase: PhaseId,
        /// Requested index
        index: usize,
        /// Number of operations in the phase
        len: usize,
    },

    /// Negative or non-finite target
    #[error("Invalid target duration: {0}")]
    InvalidTarget(f64),
}
