//! # Drive manager module
//!
//! The [`DriveMgr`] is the single owner of the drivetrain. It holds the
//! actuator, the heading source and the control loop's clock, and every
//! cycle it:
//!
//! 1. Reads the wheel positions and the heading and updates the odometry,
//!    whatever the drive mode.
//! 2. Runs exactly one of teleop control or trajectory control, chosen by
//!    the current [`DriveMode`].
//! 3. Executes the resulting demand on the actuator.
//!
//! The modes are:
//!
//! - `Disabled` - the actuator is held in its neutral output.
//! - `Teleop` - the driver's [`DriveSignal`](crate::teleop_ctrl::DriveSignal)
//!   is shaped by TeleopCtrl into output fractions.
//! - `Trajectory` - TrajCtrl follows a trajectory. Once the trajectory is
//!   finished or aborted the manager returns to `Disabled`.
//!
//! Every change of mode commands the neutral output as its last effect, as
//! does dropping the manager.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use params::*;
pub use state::*;

use crate::teleop_ctrl::TeleopCtrlError;
use crate::traj_ctrl::TrajCtrlError;
use crate::units::UnitsError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which control module is driving the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriveMode {
    Disabled,
    Teleop,
    Trajectory,
}

/// Possible errors that can occur during DriveMgr operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveMgrError {
    #[error("Invalid drive geometry: {0}")]
    GeometryError(#[from] UnitsError),

    #[error("The velocity measurement period must be positive, got {0} s")]
    InvalidVelocityPeriod(f64),

    #[error("The cycle period must be positive, got {0} s")]
    InvalidCyclePeriod(f64),

    #[error("Error in TeleopCtrl: {0}")]
    TeleopCtrlError(#[from] TeleopCtrlError),

    #[error("Error in TrajCtrl: {0}")]
    TrajCtrlError(#[from] TrajCtrlError),
}

impl Default for DriveMode {
    fn default() -> Self {
        DriveMode::Disabled
    }
}
