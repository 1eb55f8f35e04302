//! # Profile control module
//!
//! Profile control (ProfileCtrl) moves a mechanism whose motor controller
//! runs its own motion profile. A move configures the profile limits, sets
//! the position target and then waits until the mechanism is within the
//! allowed error of the target, when the mechanism is put in neutral.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One profiled move, in the mechanism's units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileMove {
    /// Position to move to.
    pub target: f64,

    /// Largest velocity the profile reaches.
    pub cruise_velocity: f64,

    pub acceleration: f64,

    /// The move is finished once the mechanism is closer than this to the
    /// target.
    pub allowed_error: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ProfileCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum ProfileCtrlError {
    #[error("A move is already running, abort it before starting another")]
    MoveAlreadyRunning,

    #[error(
        "Invalid move {0:?}, the target must be finite and the limits and allowed error greater \
         than zero"
    )]
    InvalidMove(ProfileMove),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ProfileMove {
    pub fn validate(&self) -> Result<(), ProfileCtrlError> {
        let limits_positive = self.cruise_velocity > 0.0
            && self.acceleration > 0.0
            && self.allowed_error > 0.0
            && self.cruise_velocity.is_finite()
            && self.acceleration.is_finite();

        if !(self.target.is_finite() && limits_positive) {
            return Err(ProfileCtrlError::InvalidMove(*self));
        }

        Ok(())
    }
}
