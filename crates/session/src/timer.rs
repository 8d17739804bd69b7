//! Run timer - elapsed-time tracking for the whole session.

use serde::Serialize;
use tracing::{debug, info};
use smed_core::Time;
use crate::clock::Clock;

/// Timing state of the run.
///
/// While `running`, `elapsed_ms` is derived from `now - started_at`; once
/// paused it stays frozen at the last measured value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    /// The clock is ticking
    pub running: bool,

    /// A run has been started since the last reset
    pub has_started: bool,

    /// Virtual start instant, shifted by any paused time
    pub started_at: Option<Time>,

    /// Elapsed run time, in milliseconds
    pub elapsed_ms: u64,
}

/// What [`RunTimer::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStart {
    /// First start since the last reset
    Fresh,
    /// Continued after a pause
    Resumed,
    /// Was already running; elapsed time was refreshed
    AlreadyRunning,
}

/// Owns the run state and the clock it is measured against.
pub struct RunTimer<C: Clock> {
    clock: C,
    state: RunState,
}

impl<C: Clock> RunTimer<C> {
    /// Create a stopped timer.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: RunState::default(),
        }
    }

    /// Current run state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Elapsed time as last computed.
    pub fn elapsed_ms(&self) -> u64 {
        self.state.elapsed_ms
    }

    /// Whether the clock is ticking.
    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Whether a run is in progress (running or paused).
    pub fn has_started(&self) -> bool {
        self.state.has_started
    }

    /// Current wall-clock time.
    pub fn now(&self) -> Time {
        self.clock.now()
    }

    /// Start or resume the run.
    ///
    /// The virtual start is placed `elapsed_ms` before now, so a resume
    /// continues from where the pause left off.
    pub fn start(&mut self) -> TimerStart {
        if self.state.running {
            self.tick();
            return TimerStart::AlreadyRunning;
        }

        let fresh = !self.state.has_started;
        let now = self.clock.now();
        self.state.has_started = true;
        self.state.started_at = Some(now - chrono::Duration::milliseconds(self.state.elapsed_ms as i64));
        self.state.running = true;

        if fresh {
            info!("Run started");
            TimerStart::Fresh
        } else {
            info!("Run resumed at {} ms", self.state.elapsed_ms);
            TimerStart::Resumed
        }
    }

    /// Freeze elapsed time. Returns `false` when the timer was not running.
    pub fn pause(&mut self) -> bool {
        if !self.state.running {
            return false;
        }
        self.state.elapsed_ms = self.measure();
        self.state.running = false;
        info!("Run paused at {} ms", self.state.elapsed_ms);
        true
    }

    /// Pause, then return to the initial state.
    pub fn reset(&mut self) {
        self.pause();
        self.state = RunState::default();
        info!("Run reset");
    }

    /// Refresh elapsed time from the clock. No-op while paused.
    pub fn tick(&mut self) -> u64 {
        if self.state.running {
            self.state.elapsed_ms = self.measure();
            debug!("Tick: {} ms", self.state.elapsed_ms);
        }
        self.state.elapsed_ms
    }

    fn measure(&self) -> u64 {
        match self.state.started_at {
            Some(started_at) => (self.clock.now() - started_at).num_milliseconds().max(0) as u64,
            None => self.state.elapsed_ms,
        }
    }
}
