//! # Teleop control module
//!
//! Converts the driver's joystick input into left and right output
//! fractions. Each cycle the input is:
//!
//! 1. Deadbanded
//! 2. Scaled for slow mode, or squared
//! 3. Scaled by the adjustment gains
//! 4. Slew rate limited (speed only)
//! 5. Mixed with curvature steering and normalised

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The driver's input for one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveSignal {
    /// Forward speed, between -1 and +1.
    pub speed: f64,

    /// Turn, between -1 and +1, positive counter-clockwise.
    pub turn: f64,

    /// Steady bias added to the turn, between -1 and +1.
    pub trim: f64,

    /// Slow (precision) mode.
    pub slow: bool,
}

impl DriveSignal {
    pub fn new(speed: f64, turn: f64, trim: f64, slow: bool) -> Self {
        Self {
            speed,
            turn,
            trim,
            slow,
        }
    }
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during TeleopCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum TeleopCtrlError {
    #[error("Invalid speed slew rate limits: {0}")]
    SlewError(#[from] crate::slew::SlewError),
}
