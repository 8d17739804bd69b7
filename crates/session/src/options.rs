//! Session settings.

use std::time::Duration;
use smed_core::ConfigLimits;

/// Settings for a run session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How often the driver should call `tick()` while running
    pub tick_interval: Duration,

    /// Team size bounds applied to configuration edits
    pub limits: ConfigLimits,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            limits: ConfigLimits::default(),
        }
    }
}

impl SessionOptions {
    /// Set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the team size bounds.
    pub fn with_limits(mut self, limits: ConfigLimits) -> Self {
        self.limits = limits;
        self
    }
}
