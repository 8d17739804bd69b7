//! Read-only views of the run for rendering.

use serde::Serialize;
use smed_core::{ChangeoverConfig, OperationId, OperatorId, PhaseId, SessionResults};
use crate::tracker::OperatorProgressTracker;

/// State of one step in an operator lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum StepStatus {
    /// Recorded in this session
    Done {
        /// Measured duration
        actual_ms: u64,
    },
    /// The operator's current step
    Active,
    /// Queued behind the current step
    Waiting,
}

/// One step of an operator lane.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    /// Operation shown
    pub operation_id: OperationId,
    /// Phase it belongs to
    pub phase_id: PhaseId,
    /// Phase display name
    pub phase_name: String,
    /// Operation label
    pub label: String,
    /// Planned duration
    pub target_minutes: f64,
    /// Progress of the step
    pub status: StepStatus,
}

/// An operator and their sequence of internal operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneView {
    /// Lane owner
    pub operator_id: OperatorId,
    /// Owner display name
    pub operator_name: String,
    /// Internal operations in sequence order
    pub steps: Vec<StepView>,
    /// Steps recorded in this session
    pub completed: usize,
    /// Steps in the lane
    pub total: usize,
}

impl LaneView {
    /// Completion percentage, rounded. An empty lane reports 0.
    pub fn progress_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }
}

/// Build every lane in team order.
pub fn lanes(config: &ChangeoverConfig, tracker: &OperatorProgressTracker) -> Vec<LaneView> {
    config
        .operators
        .iter()
        .map(|operator| {
            let active = tracker
                .lane(&operator.id)
                .and_then(|lane| lane.current_operation_id.clone())
                .or_else(|| tracker.first_pending(config, &operator.id));

            let steps: Vec<StepView> = config
                .operator_sequence(&operator.id)
                .into_iter()
                .map(|op| {
                    let status = match tracker.results().get(op.id()) {
                        Some(result) => StepStatus::Done { actual_ms: result.actual_ms },
                        None if active.as_ref() == Some(op.id()) => StepStatus::Active,
                        None => StepStatus::Waiting,
                    };
                    StepView {
                        operation_id: op.id().clone(),
                        phase_id: op.phase.id.clone(),
                        phase_name: op.phase.name.clone(),
                        label: op.operation.label.clone(),
                        target_minutes: op.operation.target_minutes,
                        status,
                    }
                })
                .collect();

            let completed = steps
                .iter()
                .filter(|step| matches!(step.status, StepStatus::Done { .. }))
                .count();
            LaneView {
                operator_id: operator.id.clone(),
                operator_name: operator.name.clone(),
                total: steps.len(),
                completed,
                steps,
            }
        })
        .collect()
}

/// Planned versus live totals for one internal phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseObjective {
    /// Phase summarized
    pub phase_id: PhaseId,
    /// Phase display name
    pub name: String,
    /// Sum of operation targets
    pub target_minutes: f64,
    /// Sum of recorded durations; `None` until one operation is recorded
    pub actual_ms: Option<u64>,
}

/// Planned versus live totals for the whole changeover.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectivesSummary {
    /// Internal phases in configuration order
    pub phases: Vec<PhaseObjective>,
    /// Total planned duration
    pub target_minutes: f64,
    /// Total recorded duration, `None` before any result
    pub actual_ms: Option<u64>,
}

/// Summarize targets and the live session results per internal phase.
pub fn objectives(config: &ChangeoverConfig, results: &SessionResults) -> ObjectivesSummary {
    let mut phases = Vec::new();
    let mut target_minutes = 0.0;
    let mut actual_ms: Option<u64> = None;

    for phase in config.internal_phases() {
        let recorded: Vec<u64> = phase
            .operations
            .iter()
            .filter_map(|op| results.get(&op.id).map(|r| r.actual_ms))
            .collect();
        let actual = (!recorded.is_empty()).then(|| recorded.iter().sum::<u64>());

        target_minutes += phase.target_minutes();
        if let Some(ms) = actual {
            actual_ms = Some(actual_ms.unwrap_or(0) + ms);
        }
        phases.push(PhaseObjective {
            phase_id: phase.id.clone(),
            name: phase.name.clone(),
            target_minutes: phase.target_minutes(),
            actual_ms: actual,
        });
    }

    ObjectivesSummary {
        phases,
        target_minutes,
        actual_ms,
    }
}
