//! The run session - single owner of all mutable run state.
//!
//! Collaborators read snapshots and send user intents; every transition goes
//! through a method here, which keeps timer, lanes, results and preparation
//! consistent with the configuration.

use tracing::{info, warn};
use smed_core::{
    ChangeoverConfig, LastRun, OperationId, OperationPatch, OperatorId, PersistedState, PhaseId,
    SessionResults,
};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SessionError};
use crate::options::SessionOptions;
use crate::prep::{PreparationProgress, PreparationStatus};
use crate::timer::{RunState, RunTimer, TimerStart};
use crate::tracker::{Completion, LaneState, OperatorProgressTracker};
use crate::view::{self, LaneView, ObjectivesSummary};

/// What a start request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new run began; previous session results were cleared
    Started,
    /// A paused run continued
    Resumed,
    /// The run was already going
    AlreadyRunning,
    /// Preparation is incomplete; call `start_confirmed` to override
    NeedsConfirmation {
        /// Preparation operations not marked ready
        pending: Vec<OperationId>,
    },
}

/// A changeover run session.
pub struct Session<C: Clock = SystemClock> {
    config: ChangeoverConfig,
    options: SessionOptions,
    timer: RunTimer<C>,
    tracker: OperatorProgressTracker,
    preparation: PreparationStatus,
    last_run: Option<LastRun>,
    complete: bool,
    pending_snapshot: Option<PersistedState>,
}

impl<C: Clock> Session<C> {
    /// Open a session over a persisted state. The configuration is normalized.
    pub fn new(state: PersistedState, clock: C) -> Self {
        let mut config = state.config;
        let fixes = config.normalize();
        if !fixes.is_empty() {
            warn!("Configuration needed {} repair(s) on load", fixes.len());
        }
        let mut tracker = OperatorProgressTracker::new();
        tracker.reinitialize(&config);
        let preparation = PreparationStatus::from_config(&config);

        Self {
            config,
            options: SessionOptions::default(),
            timer: RunTimer::new(clock),
            tracker,
            preparation,
            last_run: state.last_run,
            complete: false,
            pending_snapshot: None,
        }
    }

    /// Replace the session settings.
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    // === Read access ===

    /// The configuration.
    pub fn config(&self) -> &ChangeoverConfig {
        &self.config
    }

    /// Session settings.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Timer state.
    pub fn run_state(&self) -> &RunState {
        self.timer.state()
    }

    /// Elapsed run time as last computed.
    pub fn elapsed_ms(&self) -> u64 {
        self.timer.elapsed_ms()
    }

    /// Lane cursor of one operator.
    pub fn lane_state(&self, operator_id: &OperatorId) -> Option<&LaneState> {
        self.tracker.lane(operator_id)
    }

    /// Results recorded in this session.
    pub fn results(&self) -> &SessionResults {
        self.tracker.results()
    }

    /// Most recent completed run.
    pub fn last_run(&self) -> Option<&LastRun> {
        self.last_run.as_ref()
    }

    /// Preparation flags.
    pub fn preparation(&self) -> &PreparationStatus {
        &self.preparation
    }

    /// Ready versus total preparation operations.
    pub fn preparation_progress(&self) -> PreparationProgress {
        self.preparation.progress(&self.config)
    }

    /// Operator lanes in team order.
    pub fn lanes(&self) -> Vec<LaneView> {
        view::lanes(&self.config, &self.tracker)
    }

    /// Targets versus live results per phase.
    pub fn objectives_summary(&self) -> ObjectivesSummary {
        view::objectives(&self.config, self.tracker.results())
    }

    /// True when every internal operation has a session result.
    pub fn is_session_complete(&self) -> bool {
        self.tracker.is_session_complete(&self.config)
    }

    /// The state that should be persisted right now.
    pub fn snapshot(&self) -> PersistedState {
        PersistedState::new(self.config.clone(), self.last_run.clone())
    }

    /// Take the snapshot emitted by the last persistence-worthy change, if any.
    pub fn take_pending_snapshot(&mut self) -> Option<PersistedState> {
        self.pending_snapshot.take()
    }

    // === Run control ===

    /// Start or resume the run, asking for confirmation when preparation is incomplete.
    pub fn start(&mut self) -> StartOutcome {
        if !self.timer.has_started() {
            let pending = self.preparation.pending(&self.config);
            if !pending.is_empty() {
                info!("Start deferred: {} preparation step(s) not ready", pending.len());
                return StartOutcome::NeedsConfirmation { pending };
            }
        }
        self.start_confirmed()
    }

    /// Start or resume the run regardless of preparation.
    pub fn start_confirmed(&mut self) -> StartOutcome {
        let was_started = self.timer.has_started();
        if !was_started {
            self.tracker.reinitialize(&self.config);
            self.complete = false;
        }
        let outcome = match self.timer.start() {
            TimerStart::Fresh => StartOutcome::Started,
            TimerStart::Resumed => StartOutcome::Resumed,
            TimerStart::AlreadyRunning => StartOutcome::AlreadyRunning,
        };
        self.tracker
            .ensure_step_start_times(&self.config, self.timer.state());
        outcome
    }

    /// Pause the run. Returns `false` when it was not running.
    pub fn pause(&mut self) -> bool {
        self.timer.pause()
    }

    /// Stop the run and clear session results, lanes and preparation.
    pub fn reset(&mut self) {
        self.timer.reset();
        self.tracker.clear();
        self.tracker.sync_operators(&self.config);
        self.preparation.reset(&self.config);
        self.complete = false;
    }

    /// Refresh elapsed time.
    pub fn tick(&mut self) -> u64 {
        self.timer.tick()
    }

    /// Complete the operator's current step.
    pub fn complete_current_operation(&mut self, operator_id: &OperatorId) -> Result<Completion> {
        self.timer.tick();
        let now = self.timer.now();
        let completion = self.tracker.complete_current_operation(
            &self.config,
            operator_id,
            self.timer.state(),
            now,
        )?;
        self.promote_if_complete();
        Ok(completion)
    }

    /// Complete a specific operation; it must be its operator's current step.
    pub fn complete_operation(&mut self, operation_id: &OperationId) -> Result<Completion> {
        self.timer.tick();
        let now = self.timer.now();
        let completion = self.tracker.complete_operation(
            &self.config,
            operation_id,
            self.timer.state(),
            now,
        )?;
        self.promote_if_complete();
        Ok(completion)
    }

    // === Preparation ===

    /// Flip the readiness of a preparation operation, returning the new value.
    pub fn toggle_preparation(&mut self, operation_id: &OperationId) -> Result<bool> {
        let ready = !self.preparation.is_ready(operation_id);
        self.set_preparation(operation_id, ready)?;
        Ok(ready)
    }

    /// Set the readiness of a preparation operation.
    pub fn set_preparation(&mut self, operation_id: &OperationId, ready: bool) -> Result<()> {
        if self.timer.has_started() {
            return Err(SessionError::PreparationLocked);
        }
        let op = self
            .config
            .find_operation(operation_id)
            .ok_or_else(|| SessionError::UnknownOperation(operation_id.clone()))?;
        if op.is_internal() {
            return Err(SessionError::NotPreparation(operation_id.clone()));
        }
        self.preparation.set(operation_id.clone(), ready);
        Ok(())
    }

    // === Configuration edits ===

    /// Add an operator.
    pub fn add_operator(&mut self) -> Result<OperatorId> {
        let id = self.config.add_operator(&self.options.limits)?;
        self.after_config_change();
        Ok(id)
    }

    /// Remove an operator; their operations go to the first remaining operator.
    pub fn remove_operator(&mut self, operator_id: &OperatorId) -> Result<Vec<OperationId>> {
        let reassigned = self
            .config
            .remove_operator(operator_id, &self.options.limits)?;
        self.after_config_change();
        Ok(reassigned)
    }

    /// Rename an operator.
    pub fn rename_operator(&mut self, operator_id: &OperatorId, name: &str) -> Result<()> {
        self.config.rename_operator(operator_id, name)?;
        self.after_config_change();
        Ok(())
    }

    /// Add an operation to a phase.
    pub fn add_operation(&mut self, phase_id: &PhaseId, patch: OperationPatch) -> Result<OperationId> {
        let id = self.config.add_operation(phase_id, patch)?;
        if self.config.external_phase().map(|p| &p.id) == Some(phase_id) {
            self.preparation.set(id.clone(), false);
        }
        self.after_config_change();
        Ok(id)
    }

    /// Remove an operation and every result recorded for it.
    pub fn remove_operation(&mut self, operation_id: &OperationId) -> Result<()> {
        self.config.remove_operation(operation_id)?;
        self.tracker.strip_result(operation_id);
        if let Some(run) = self.last_run.as_mut() {
            run.strip(operation_id);
        }
        self.preparation.remove(operation_id);
        self.after_config_change();
        Ok(())
    }

    /// Reorder an operation within its phase.
    pub fn move_operation(&mut self, phase_id: &PhaseId, from: usize, to: usize) -> Result<()> {
        self.config.move_operation(phase_id, from, to)?;
        self.after_config_change();
        Ok(())
    }

    /// Update an operation's label, target or operator.
    pub fn update_operation(&mut self, operation_id: &OperationId, patch: OperationPatch) -> Result<()> {
        self.config.update_operation(operation_id, patch)?;
        self.after_config_change();
        Ok(())
    }

    /// Select the preparation phase. Changing it resets preparation flags.
    pub fn set_external_phase(&mut self, phase_id: Option<&PhaseId>) -> Result<()> {
        if self.config.set_external_phase(phase_id)? {
            self.preparation.reset(&self.config);
        }
        self.after_config_change();
        Ok(())
    }

    /// Replace the whole configuration, e.g. after a reload.
    pub fn replace_config(&mut self, mut config: ChangeoverConfig) {
        config.normalize();
        let external_changed = config.external_phase().map(|p| &p.id)
            != self.config.external_phase().map(|p| &p.id);
        self.config = config;
        if external_changed {
            self.preparation.reset(&self.config);
        }
        self.after_config_change();
    }

    fn after_config_change(&mut self) {
        self.tracker.sync_operators(&self.config);
        if self.timer.has_started() {
            self.tracker
                .ensure_step_start_times(&self.config, self.timer.state());
            self.promote_if_complete();
        }
        self.pending_snapshot = Some(self.snapshot());
    }

    /// Pause and archive the run the moment every internal operation is recorded.
    fn promote_if_complete(&mut self) {
        let complete = self.tracker.is_session_complete(&self.config);
        if complete && !self.complete {
            self.timer.pause();
            let generated_at = self.timer.now();
            self.last_run = Some(LastRun::new(generated_at, self.tracker.results().clone()));
            info!(
                "Run complete after {} ms; {} result(s) archived",
                self.timer.elapsed_ms(),
                self.tracker.results().len()
            );
            self.pending_snapshot = Some(self.snapshot());
        }
        self.complete = complete;
    }
}

impl Session<SystemClock> {
    /// Open a session on the system clock.
    pub fn with_system_clock(state: PersistedState) -> Self {
        Self::new(state, SystemClock)
    }
}
