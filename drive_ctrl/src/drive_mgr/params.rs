//! Parameters structure for DriveMgr

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::DriveMgrError;
use crate::traj_ctrl::{self, ControllerParams};
use crate::units::DriveGeometry;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drivetrain.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DriveParams {
    pub geometry: DriveGeometry,

    /// Period the motor controllers measure velocity over, velocities are
    /// read and demanded in sensor units per this period.
    ///
    /// Units: seconds
    pub velocity_period_s: f64,

    /// Period of the control loop.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveParams {
    /// Check the geometry and the periods are all positive.
    pub fn validate(&self) -> Result<(), DriveMgrError> {
        self.geometry.validate()?;

        if !(self.velocity_period_s > 0.0) {
            return Err(DriveMgrError::InvalidVelocityPeriod(self.velocity_period_s));
        }
        if !(self.cycle_period_s > 0.0) {
            return Err(DriveMgrError::InvalidCyclePeriod(self.cycle_period_s));
        }

        Ok(())
    }

    /// The LTV controller's period, if LTV is selected and its period is not
    /// the control cycle period.
    ///
    /// The LTV gains are only valid at the period they were computed for.
    pub fn ltv_period_mismatch(&self, traj_params: &traj_ctrl::Params) -> Option<f64> {
        match traj_params.controller {
            ControllerParams::Ltv(ltv)
                if (ltv.dt_s - self.cycle_period_s).abs() > 1e-9 * self.cycle_period_s =>
            {
                Some(ltv.dt_s)
            }
            _ => None,
        }
    }
}
