//! Parameters structure for TeleopCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::drive_util::CurvatureMode;
use crate::slew::RateLimits;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Teleop control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- INPUT SHAPING ----
    /// Joystick inputs smaller than this are ignored.
    pub deadband: f64,

    /// Gain applied to the input outside the deadband, 1 gives a straight
    /// line from zero at the deadband to one at full input.
    pub deadband_smoothing: f64,

    /// Square the inputs for finer control near zero. Not applied in slow
    /// mode.
    pub square_inputs: bool,

    /// Scale applied to every input in slow mode.
    pub slow_speed: f64,

    // ---- GAINS ----
    pub speed_adjustment: f64,
    pub turn_adjustment: f64,
    pub trim_adjustment: f64,

    /// How turn authority scales with speed.
    #[serde(default)]
    pub curvature_mode: CurvatureMode,

    // ---- LIMITS ----
    /// Rate limits on the speed term.
    ///
    /// Units: 1/second
    pub speed_rate_limits: RateLimits,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            deadband: 0.07,
            deadband_smoothing: 1.0,
            square_inputs: true,
            slow_speed: 0.2,
            speed_adjustment: 0.75,
            turn_adjustment: 0.5,
            trim_adjustment: 0.23,
            curvature_mode: CurvatureMode::Absolute,
            speed_rate_limits: RateLimits {
                away_from_zero: 1.5,
                toward_zero: 3.0,
            },
        }
    }
}
