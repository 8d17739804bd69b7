//! Session errors.

use smed_core::{ConfigError, OperationId, OperatorId};

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Rejected user intents. A rejected call never changes the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The run has not been started
    #[error("The run has not been started")]
    NotStarted,

    /// Operator does not exist
    #[error("Unknown operator: {0}")]
    UnknownOperator(OperatorId),

    /// Operation does not exist
    #[error("Unknown operation: {0}")]
    UnknownOperation(OperationId),

    /// Operator has nothing left to complete
    #[error("Operator {0} has no current step")]
    NoCurrentStep(OperatorId),

    /// Only the operator's current step can be completed
    #[error("Operation {operation} is not the current step of operator {operator}")]
    NotCurrentStep {
        /// Requested operation
        operation: OperationId,
        /// Its assigned operator
        operator: OperatorId,
        /// The operator's actual current step
        current: Option<OperationId>,
    },

    /// Preparation operations are not timed
    #[error("Operation {0} belongs to the preparation phase")]
    NotTimed(OperationId),

    /// Only preparation operations have a readiness flag
    #[error("Operation {0} is not a preparation operation")]
    NotPreparation(OperationId),

    /// Preparation cannot change once the run has started
    #[error("Preparation is locked once the run has started")]
    PreparationLocked,

    /// Configuration edit rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
}
