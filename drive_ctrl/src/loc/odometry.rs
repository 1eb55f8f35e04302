//! # Wheel odometry
//!
//! Integrates the distance travelled by each side of the drivetrain into a
//! pose estimate. The heading is never integrated from the wheels, it is
//! always taken from the absolute heading source so that wheel slip during
//! turns does not accumulate into heading drift.
//!
//! Each update moves the pose along the arc joining the previous and current
//! headings (the exponential of a twist), rather than along the chord.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};

// Internal
use super::{Pose2D, Twist2D};
use util::maths::{ang_dist, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Odometry state.
#[derive(Debug, Clone)]
pub struct Odometry {
    /// Current pose estimate.
    pose: Pose2D,

    /// Offset added to the raw heading so that it matches the field frame.
    ///
    /// Units: radians
    heading_offset_rad: f64,

    /// Field frame heading at the last update.
    ///
    /// Units: radians
    prev_heading_rad: f64,

    /// Units: meters
    prev_left_m: f64,

    /// Units: meters
    prev_right_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Odometry {
    /// Create a new estimate starting at `initial_pose`.
    ///
    /// `heading_deg` is the heading source's current reading, the wheel
    /// distances are assumed to be zero.
    pub fn new(heading_deg: f64, initial_pose: Pose2D) -> Self {
        let mut odom = Self {
            pose: initial_pose,
            heading_offset_rad: 0.0,
            prev_heading_rad: 0.0,
            prev_left_m: 0.0,
            prev_right_m: 0.0,
        };
        odom.reset_position(initial_pose, heading_deg, 0.0, 0.0);
        odom
    }

    /// Re-anchor the estimate at `pose`.
    ///
    /// The heading source is not zeroed, instead the offset between its
    /// reading and the pose's heading is stored and applied to every future
    /// reading. The wheel distances are the current readings, not deltas.
    pub fn reset_position(&mut self, pose: Pose2D, heading_deg: f64, left_m: f64, right_m: f64) {
        self.pose = pose;
        self.heading_offset_rad = ang_dist(heading_deg.to_radians(), pose.heading_rad);
        self.prev_heading_rad = pose.heading_rad;
        self.prev_left_m = left_m;
        self.prev_right_m = right_m;

        debug!(
            "Odometry reset to ({:.3}, {:.3}, {:.3} rad), heading offset {:.3} rad",
            pose.position_m[0], pose.position_m[1], pose.heading_rad, self.heading_offset_rad
        );
    }

    /// Update the estimate with the latest heading and total wheel distances,
    /// returning the new pose.
    ///
    /// Must be called every control cycle whatever the drive mode.
    pub fn update(&mut self, heading_deg: f64, left_m: f64, right_m: f64) -> Pose2D {
        let delta_left_m = left_m - self.prev_left_m;
        let delta_right_m = right_m - self.prev_right_m;
        self.prev_left_m = left_m;
        self.prev_right_m = right_m;

        let avg_delta_m = (delta_left_m + delta_right_m) / 2.0;

        let heading_rad = wrap_pi(heading_deg.to_radians() + self.heading_offset_rad);

        let new_pose = self.pose.exp(&Twist2D::new(
            avg_delta_m,
            0.0,
            ang_dist(self.prev_heading_rad, heading_rad),
        ));
        self.prev_heading_rad = heading_rad;

        // Position from the arc, heading straight from the sensor
        self.pose = Pose2D {
            position_m: new_pose.position_m,
            heading_rad,
        };

        trace!(
            "Odometry: ({:.3}, {:.3}, {:.3} rad)",
            self.pose.position_m[0],
            self.pose.position_m[1],
            self.pose.heading_rad
        );

        self.pose
    }

    /// The current pose estimate.
    pub fn pose(&self) -> Pose2D {
        self.pose
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    #[test]
    fn test_straight_line() {
        for &heading_deg in &[0.0f64, 30.0, 90.0, -135.0, 180.0] {
            let mut odom = Odometry::new(heading_deg, Pose2D::new(1.0, -2.0, heading_deg.to_radians()));

            let mut dist_m = 0.0;
            for _ in 0..50 {
                dist_m += 0.04;
                odom.update(heading_deg, dist_m, dist_m);
            }

            let pose = odom.pose();
            let heading_rad: f64 = heading_deg.to_radians();
            assert_relative_eq!(pose.position_m[0], 1.0 + 2.0 * heading_rad.cos(), epsilon = EPS);
            assert_relative_eq!(pose.position_m[1], -2.0 + 2.0 * heading_rad.sin(), epsilon = EPS);
            assert_relative_eq!(
                ang_dist(heading_rad, pose.heading_rad),
                0.0,
                epsilon = EPS
            );
        }
    }

    #[test]
    fn test_turn_in_place() {
        let mut odom = Odometry::new(0.0, Pose2D::default());

        // Equal and opposite wheel motion while the gyro reports a turn
        let pose = odom.update(90.0, -0.3, 0.3);
        assert_relative_eq!(pose.position_m.norm(), 0.0, epsilon = EPS);
        assert_relative_eq!(pose.heading_rad, FRAC_PI_2, epsilon = EPS);
    }

    #[test]
    fn test_arc() {
        let mut odom = Odometry::new(0.0, Pose2D::default());

        // Quarter circle of 1 m radius, split into many small steps
        let steps = 100;
        for i in 1..=steps {
            let frac = i as f64 / steps as f64;
            let dist_m = FRAC_PI_2 * frac;
            odom.update(90.0 * frac, dist_m, dist_m);
        }

        let pose = odom.pose();
        assert_relative_eq!(pose.position_m[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(pose.position_m[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_reset_keeps_heading_zero() {
        // Gyro reads 45 degrees but the robot is placed facing the field -Y
        let mut odom = Odometry::new(0.0, Pose2D::default());
        odom.reset_position(Pose2D::new(3.0, 4.0, -FRAC_PI_2), 45.0, 10.0, 12.0);

        // No motion since the reset
        let pose = odom.update(45.0, 10.0, 12.0);
        assert_relative_eq!(pose.position_m[0], 3.0, epsilon = EPS);
        assert_relative_eq!(pose.position_m[1], 4.0, epsilon = EPS);
        assert_relative_eq!(pose.heading_rad, -FRAC_PI_2, epsilon = EPS);

        // Gyro turns a further 90 degrees counter-clockwise, so the robot now
        // faces the field +X axis, and both wheels move 1 m
        let pose = odom.update(135.0, 11.0, 13.0);
        assert_relative_eq!(pose.heading_rad, 0.0, epsilon = EPS);
        assert!(pose.position_m[0] > 3.0);
        assert!(pose.position_m[1] < 4.0);
    }

    #[test]
    fn test_heading_wraps() {
        let mut odom = Odometry::new(179.0, Pose2D::new(0.0, 0.0, 179f64.to_radians()));
        let pose = odom.update(-179.0, 0.0, 0.0);
        assert_relative_eq!(pose.heading_rad.abs(), PI - 1f64.to_radians(), epsilon = EPS);
    }
}
