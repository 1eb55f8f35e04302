//! Drive demands

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use crate::eqpt::{Neutral, Tank, VelocityDrive, VoltageDrive};
use crate::kinematics::WheelSpeeds;
use crate::units::UnitConverter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A demand which the actuators must execute this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DriveDemand {
    /// Stop driving, letting the motor controllers apply their neutral mode.
    Neutral,

    /// Fraction of full output on each side, between -1 and +1.
    OutputFraction { left: f64, right: f64 },

    /// Closed loop wheel velocity, executed by the motor controllers.
    Velocity(WheelSpeeds),

    /// Voltage on each side.
    ///
    /// Units: volts
    Voltage { left_v: f64, right_v: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriveDemand {
    fn default() -> Self {
        DriveDemand::Neutral
    }
}

impl DriveDemand {
    /// Zero output fraction on both sides.
    pub fn zero_output() -> Self {
        DriveDemand::OutputFraction {
            left: 0.0,
            right: 0.0,
        }
    }

    /// Zero velocity on both sides.
    pub fn zero_velocity() -> Self {
        DriveDemand::Velocity(WheelSpeeds::default())
    }

    /// True if executing this demand leaves the wheels unpowered.
    pub fn is_zero(&self) -> bool {
        match *self {
            DriveDemand::Neutral => true,
            DriveDemand::OutputFraction { left, right } => left == 0.0 && right == 0.0,
            DriveDemand::Velocity(speeds) => speeds.left_ms == 0.0 && speeds.right_ms == 0.0,
            DriveDemand::Voltage { left_v, right_v } => left_v == 0.0 && right_v == 0.0,
        }
    }

    /// Send the demand to the actuators.
    ///
    /// Velocities are converted into sensor units per `velocity_period_s`
    /// before being sent.
    pub fn execute<A>(&self, actuator: &mut A, conv: &UnitConverter, velocity_period_s: f64)
    where
        A: Tank + VelocityDrive + VoltageDrive + Neutral,
    {
        match *self {
            DriveDemand::Neutral => actuator.neutral(),
            DriveDemand::OutputFraction { left, right } => actuator.tank(left, right),
            DriveDemand::Velocity(speeds) => actuator.velocity(
                conv.from_velocity(speeds.left_ms, velocity_period_s),
                conv.from_velocity(speeds.right_ms, velocity_period_s),
            ),
            DriveDemand::Voltage { left_v, right_v } => actuator.voltage(left_v, right_v),
        }
    }
}
