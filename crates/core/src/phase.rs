//! Phase model - changeover stages and the operations they contain.

use serde::{Deserialize, Serialize};
use crate::id::{OperatorId, OperationId, PhaseId};

/// A member of the changeover team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    /// Unique identifier
    #[serde(default)]
    pub id: OperatorId,

    /// Display name
    #[serde(default)]
    pub name: String,
}

impl Operator {
    /// Create a new operator.
    pub fn new(id: impl Into<OperatorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A single timed step of the changeover, owned by exactly one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique identifier
    #[serde(default)]
    pub id: OperationId,

    /// Short description shown to the operator
    #[serde(default)]
    pub label: String,

    /// Operator assigned to this operation
    #[serde(default)]
    pub operator_id: OperatorId,

    /// Planned duration in minutes
    #[serde(default)]
    pub target_minutes: f64,
}

impl Operation {
    /// Create a new operation.
    pub fn new(
        id: impl Into<OperationId>,
        label: impl Into<String>,
        operator_id: impl Into<OperatorId>,
        target_minutes: f64,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            operator_id: operator_id.into(),
            target_minutes,
        }
    }

    /// Planned duration in milliseconds.
    pub fn target_ms(&self) -> u64 {
        crate::minutes_to_ms(self.target_minutes)
    }
}

/// A stage of the changeover.
///
/// Phase order is display order only; it never expresses a dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    /// Unique identifier
    #[serde(default)]
    pub id: PhaseId,

    /// Phase name
    #[serde(default)]
    pub name: String,

    /// Preparation phase, performed before the timed run starts
    #[serde(default)]
    pub is_external: bool,

    /// Operations in execution order
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Phase {
    /// Create an empty internal phase.
    pub fn new(id: impl Into<PhaseId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_external: false,
            operations: Vec::new(),
        }
    }

    /// Mark this phase as the external (preparation) phase.
    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }

    /// Append an operation.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Sum of operation targets, in minutes.
    pub fn target_minutes(&self) -> f64 {
        self.operations
            .iter()
            .map(|op| op.target_minutes.max(0.0))
            .sum()
    }
}

/// An operation together with the phase that owns it.
#[derive(Debug, Clone, Copy)]
pub struct OperationRef<'a> {
    /// Owning phase
    pub phase: &'a Phase,

    /// The operation itself
    pub operation: &'a Operation,
}

impl<'a> OperationRef<'a> {
    /// Operation identifier.
    pub fn id(&self) -> &'a OperationId {
        &self.operation.id
    }

    /// True when the owning phase is not the preparation phase.
    pub fn is_internal(&self) -> bool {
        !self.phase.is_external
    }
}
