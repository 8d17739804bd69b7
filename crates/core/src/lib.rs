//! SMED core data models.
//!
//! This crate defines the changeover configuration (operators, phases and
//! operations), the timing results recorded during a run, and the snapshot
//! handed to the persistence layer.

#![warn(missing_docs)]

// Core identities
mod id;

// Changeover configuration
mod phase;
mod config;
mod normalize;
mod demo;

// Recorded timings
mod result;
mod snapshot;

mod error;

// Re-exports
pub use id::*;

pub use phase::{Operator, Phase, Operation, OperationRef};
pub use config::{ChangeoverConfig, ConfigLimits, OperationPatch};
pub use normalize::NormalizationFix;
pub use result::{OperationResult, SessionResults, LastRun};
pub use snapshot::{PersistedState, SNAPSHOT_VERSION};
pub use error::ConfigError;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Milliseconds in one minute.
pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Convert a duration in minutes to whole milliseconds.
pub fn minutes_to_ms(minutes: f64) -> u64 {
    if minutes.is_finite() && minutes > 0.0 {
        (minutes * MS_PER_MINUTE).round() as u64
    } else {
        0
    }
}

/// Convert milliseconds to fractional minutes.
pub fn ms_to_minutes(ms: u64) -> f64 {
    ms as f64 / MS_PER_MINUTE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minute_conversions() {
        assert_eq!(minutes_to_ms(3.0), 180_000);
        assert_eq!(minutes_to_ms(0.1), 6_000);
        assert_eq!(minutes_to_ms(-2.0), 0);
        assert_eq!(minutes_to_ms(f64::NAN), 0);
        assert!((ms_to_minutes(330_000) - 5.5).abs() < f64::EPSILON);
    }
}
