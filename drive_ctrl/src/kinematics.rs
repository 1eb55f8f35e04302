//! # Differential drive kinematics
//!
//! Converts between the velocity of the chassis and the velocities of the
//! left and right wheels.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Linear velocity of each side of the drivetrain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelSpeeds {
    /// Units: meters/second
    pub left_ms: f64,

    /// Units: meters/second
    pub right_ms: f64,
}

/// Velocity of the chassis in its own body frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChassisSpeeds {
    /// Forward velocity.
    ///
    /// Units: meters/second
    pub linear_ms: f64,

    /// Rotation rate, counter-clockwise positive.
    ///
    /// Units: radians/second
    pub angular_rads: f64,
}

/// Kinematics of a differential drive chassis with the given track width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffDriveKinematics {
    pub track_width_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelSpeeds {
    pub fn new(left_ms: f64, right_ms: f64) -> Self {
        Self { left_ms, right_ms }
    }

    /// Scale both speeds down so neither exceeds `max_speed_ms`, keeping the
    /// ratio between them.
    pub fn desaturate(&self, max_speed_ms: f64) -> Self {
        let max = self.left_ms.abs().max(self.right_ms.abs());

        if max > max_speed_ms {
            Self::new(
                self.left_ms / max * max_speed_ms,
                self.right_ms / max * max_speed_ms,
            )
        } else {
            *self
        }
    }
}

impl ChassisSpeeds {
    pub fn new(linear_ms: f64, angular_rads: f64) -> Self {
        Self {
            linear_ms,
            angular_rads,
        }
    }
}

impl DiffDriveKinematics {
    pub fn new(track_width_m: f64) -> Self {
        Self { track_width_m }
    }

    /// Wheel speeds needed to achieve the given chassis speeds.
    pub fn to_wheel_speeds(&self, chassis: &ChassisSpeeds) -> WheelSpeeds {
        let half_track_m = self.track_width_m / 2.0;

        WheelSpeeds::new(
            chassis.linear_ms - chassis.angular_rads * half_track_m,
            chassis.linear_ms + chassis.angular_rads * half_track_m,
        )
    }

    /// Chassis speeds produced by the given wheel speeds.
    pub fn to_chassis_speeds(&self, wheels: &WheelSpeeds) -> ChassisSpeeds {
        ChassisSpeeds::new(
            (wheels.left_ms + wheels.right_ms) / 2.0,
            (wheels.right_ms - wheels.left_ms) / self.track_width_m,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_line() {
        let kin = DiffDriveKinematics::new(0.6);
        let wheels = kin.to_wheel_speeds(&ChassisSpeeds::new(2.0, 0.0));
        assert_eq!(wheels, WheelSpeeds::new(2.0, 2.0));
    }

    #[test]
    fn test_turn_in_place() {
        let kin = DiffDriveKinematics::new(0.5);
        let wheels = kin.to_wheel_speeds(&ChassisSpeeds::new(0.0, 2.0));

        // Counter-clockwise means the right side drives forward
        assert_relative_eq!(wheels.left_ms, -0.5);
        assert_relative_eq!(wheels.right_ms, 0.5);
    }

    #[test]
    fn test_inverse() {
        let kin = DiffDriveKinematics::new(0.6223);
        let chassis = ChassisSpeeds::new(1.3, -0.7);
        let back = kin.to_chassis_speeds(&kin.to_wheel_speeds(&chassis));
        assert_relative_eq!(back.linear_ms, chassis.linear_ms, epsilon = 1e-12);
        assert_relative_eq!(back.angular_rads, chassis.angular_rads, epsilon = 1e-12);
    }

    #[test]
    fn test_desaturate() {
        let speeds = WheelSpeeds::new(4.0, -2.0).desaturate(2.0);
        assert_relative_eq!(speeds.left_ms, 2.0);
        assert_relative_eq!(speeds.right_ms, -1.0);

        let speeds = WheelSpeeds::new(1.0, 0.5);
        assert_eq!(speeds.desaturate(2.0), speeds);
    }
}
