//! General time utility functions
//!
//! The control loop is driven from a monotonic clock expressed in seconds. The
//! [`Clock`] trait lets the caller supply that clock, which also allows tests
//! to step time by hand.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono;
use std::time::Instant;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of monotonic time.
pub trait Clock {
    /// Seconds elapsed since the clock's own epoch. Never decreases.
    fn now_s(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Monotonic clock backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MonotonicClock {
    /// Create a clock whose epoch is now.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_s(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

impl<F> Clock for F
where
    F: Fn() -> f64,
{
    fn now_s(&self) -> f64 {
        self()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }

    #[test]
    fn test_monotonic_clock() {
        let clock = MonotonicClock::new();
        let t0 = clock.now_s();
        let t1 = clock.now_s();
        assert!(t0 >= 0.0);
        assert!(t1 >= t0);
    }

    #[test]
    fn test_closure_clock() {
        let time = Cell::new(0.0);
        let clock = || time.get();
        time.set(0.02);
        assert_eq!(clock.now_s(), 0.02);
    }
}
