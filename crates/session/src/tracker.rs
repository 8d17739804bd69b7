//! Operator progress tracking.
//!
//! Each operator walks their own internal operations strictly in
//! configuration order. Lanes run in parallel against the shared elapsed
//! clock: a step's duration is measured from that operator's own step start,
//! whatever the other operators are doing.

use std::collections::BTreeMap;
use serde::Serialize;
use tracing::{debug, info};
use smed_core::{
    ChangeoverConfig, OperationId, OperationResult, OperatorId, SessionResults, Time,
};
use crate::error::{Result, SessionError};
use crate::timer::RunState;

/// Cursor of one operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneState {
    /// Operation the operator is working on
    pub current_operation_id: Option<OperationId>,

    /// Elapsed run time when the current step began
    pub step_start_elapsed_ms: Option<u64>,
}

/// A recorded step completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Operator who finished the step
    pub operator_id: OperatorId,

    /// The finished operation
    pub operation_id: OperationId,

    /// Recorded timing
    pub result: OperationResult,

    /// Operator's next step, if any remain
    pub next_operation_id: Option<OperationId>,
}

/// Per-operator cursors and the session results they produce.
#[derive(Debug, Clone, Default)]
pub struct OperatorProgressTracker {
    lanes: BTreeMap<OperatorId, LaneState>,
    results: SessionResults,
}

impl OperatorProgressTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear results and give every operator an empty lane.
    pub fn reinitialize(&mut self, config: &ChangeoverConfig) {
        self.results.clear();
        self.lanes = config
            .operators
            .iter()
            .map(|op| (op.id.clone(), LaneState::default()))
            .collect();
    }

    /// Drop all lanes and results.
    pub fn clear(&mut self) {
        self.lanes.clear();
        self.results.clear();
    }

    /// Align lanes with the team: keep existing lanes, add empty ones for new
    /// operators, drop lanes of removed operators.
    pub fn sync_operators(&mut self, config: &ChangeoverConfig) {
        self.lanes.retain(|id, _| config.operator(id).is_some());
        for operator in &config.operators {
            self.lanes.entry(operator.id.clone()).or_default();
        }
    }

    /// Lane of one operator.
    pub fn lane(&self, operator_id: &OperatorId) -> Option<&LaneState> {
        self.lanes.get(operator_id)
    }

    /// All lanes.
    pub fn lanes(&self) -> &BTreeMap<OperatorId, LaneState> {
        &self.lanes
    }

    /// Results recorded in this session.
    pub fn results(&self) -> &SessionResults {
        &self.results
    }

    /// Forget the result of a removed operation.
    pub fn strip_result(&mut self, operation_id: &OperationId) -> bool {
        self.results.remove(operation_id).is_some()
    }

    /// First operation of the operator's sequence without a result.
    pub fn first_pending(
        &self,
        config: &ChangeoverConfig,
        operator_id: &OperatorId,
    ) -> Option<OperationId> {
        config
            .operator_sequence(operator_id)
            .into_iter()
            .find(|op| !self.results.contains_key(op.id()))
            .map(|op| op.id().clone())
    }

    /// Give every operator without a current step their first pending
    /// operation, stamped with the current elapsed time.
    ///
    /// A current step that no longer belongs to the operator (removed,
    /// reassigned or already recorded) is replaced. Calling this repeatedly
    /// changes nothing.
    pub fn ensure_step_start_times(&mut self, config: &ChangeoverConfig, run: &RunState) {
        for operator in &config.operators {
            let still_valid = self
                .lanes
                .get(&operator.id)
                .and_then(|lane| lane.current_operation_id.as_ref())
                .map(|current| self.is_pending_step_of(config, &operator.id, current))
                .unwrap_or(false);
            let next = if still_valid {
                None
            } else {
                self.first_pending(config, &operator.id)
            };

            let lane = self.lanes.entry(operator.id.clone()).or_default();
            if !still_valid {
                lane.step_start_elapsed_ms = next.as_ref().map(|_| run.elapsed_ms);
                if next.is_some() {
                    debug!("Operator {} starts {:?} at {} ms", operator.id, next, run.elapsed_ms);
                }
                lane.current_operation_id = next;
            } else if lane.step_start_elapsed_ms.is_none() {
                lane.step_start_elapsed_ms = Some(run.elapsed_ms);
            }
        }
    }

    /// Record the operator's current step and advance their cursor.
    pub fn complete_current_operation(
        &mut self,
        config: &ChangeoverConfig,
        operator_id: &OperatorId,
        run: &RunState,
        now: Time,
    ) -> Result<Completion> {
        if config.operator(operator_id).is_none() {
            return Err(SessionError::UnknownOperator(operator_id.clone()));
        }
        if !run.has_started {
            return Err(SessionError::NotStarted);
        }
        let lane = self
            .lanes
            .get(operator_id)
            .ok_or_else(|| SessionError::NoCurrentStep(operator_id.clone()))?;
        let current = lane
            .current_operation_id
            .clone()
            .ok_or_else(|| SessionError::NoCurrentStep(operator_id.clone()))?;
        if !self.is_pending_step_of(config, operator_id, &current) {
            return Err(SessionError::NoCurrentStep(operator_id.clone()));
        }

        let step_start = lane.step_start_elapsed_ms.unwrap_or(run.elapsed_ms);
        let result = OperationResult::new(run.elapsed_ms.saturating_sub(step_start), now);
        self.results.insert(current.clone(), result.clone());

        let next = self.first_pending(config, operator_id);
        if let Some(lane) = self.lanes.get_mut(operator_id) {
            lane.current_operation_id = next.clone();
            lane.step_start_elapsed_ms = next.as_ref().map(|_| run.elapsed_ms);
        }

        info!(
            "Operator {} completed {} in {} ms (next: {:?})",
            operator_id, current, result.actual_ms, next
        );
        Ok(Completion {
            operator_id: operator_id.clone(),
            operation_id: current,
            result,
            next_operation_id: next,
        })
    }

    /// Complete a specific operation, which must be its operator's current step.
    pub fn complete_operation(
        &mut self,
        config: &ChangeoverConfig,
        operation_id: &OperationId,
        run: &RunState,
        now: Time,
    ) -> Result<Completion> {
        let op = config
            .find_operation(operation_id)
            .ok_or_else(|| SessionError::UnknownOperation(operation_id.clone()))?;
        if !op.is_internal() {
            return Err(SessionError::NotTimed(operation_id.clone()));
        }
        let operator_id = op.operation.operator_id.clone();
        let current = self
            .lanes
            .get(&operator_id)
            .and_then(|lane| lane.current_operation_id.clone());
        if current.as_ref() != Some(operation_id) {
            return Err(SessionError::NotCurrentStep {
                operation: operation_id.clone(),
                operator: operator_id,
                current,
            });
        }
        self.complete_current_operation(config, &operator_id, run, now)
    }

    /// True when every internal operation has a result.
    ///
    /// A configuration without internal operations is never complete.
    pub fn is_session_complete(&self, config: &ChangeoverConfig) -> bool {
        let mut any = false;
        for op in config.internal_operations() {
            any = true;
            if !self.results.contains_key(op.id()) {
                return false;
            }
        }
        any
    }

    /// Completed and total steps of one operator.
    pub fn operator_progress(&self, config: &ChangeoverConfig, operator_id: &OperatorId) -> (usize, usize) {
        let sequence = config.operator_sequence(operator_id);
        let done = sequence
            .iter()
            .filter(|op| self.results.contains_key(op.id()))
            .count();
        (done, sequence.len())
    }

    fn is_pending_step_of(
        &self,
        config: &ChangeoverConfig,
        operator_id: &OperatorId,
        operation_id: &OperationId,
    ) -> bool {
        !self.results.contains_key(operation_id)
            && config
                .find_operation(operation_id)
                .map(|op| op.is_internal() && &op.operation.operator_id == operator_id)
                .unwrap_or(false)
    }
}
