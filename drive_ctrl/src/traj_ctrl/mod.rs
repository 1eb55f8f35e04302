//! # Trajectory control module
//!
//! Trajectory control (TrajCtrl) takes a time parameterised trajectory and
//! the robot's pose each cycle and produces the wheel demands that keep the
//! robot on it. The control law used is one of:
//!
//! - RAMSETE, a nonlinear tracking law
//! - LTV unicycle, an LQR gain scheduled on the reference velocity
//! - Feed forward only, which ignores the pose entirely
//!
//! Demands are either closed loop wheel velocities, executed by the motor
//! controllers, or voltages built from a motor feedforward and a per-wheel
//! PID loop on the measured wheel speeds.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod ltv;
mod params;
mod state;
mod trajectory;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use ltv::*;
pub use params::*;
pub use state::*;
pub use trajectory::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in building a trajectory.
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("A trajectory must contain at least one state")]
    Empty,

    #[error("Trajectory state {0} has a non-finite time")]
    NonFiniteTime(usize),

    #[error("Trajectory state {0} is not later than the state before it")]
    NotTimeIncreasing(usize),

    #[error("Could not parse the trajectory: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Could not read the trajectory file {0:?}: {1}")]
    FileLoadError(std::path::PathBuf, std::io::Error),
}

/// Possible errors that can occur during TrajCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("A trajectory is already being followed, abort it before starting another")]
    TrajectoryAlreadyRunning,

    #[error("Invalid LTV controller parameters: {0:?}")]
    InvalidLtvParams(LtvParams),

    #[error("Invalid track width {0} m, it must be greater than zero")]
    InvalidTrackWidth(f64),

    #[error(
        "Invalid RAMSETE gains b = {0}, zeta = {1}, b must be zero or more and zeta between 0 and 1"
    )]
    InvalidRamseteParams(f64, f64),

    #[error("Invalid maximum wheel speed {0} m/s, it must be greater than zero")]
    InvalidMaxWheelSpeed(f64),
}
