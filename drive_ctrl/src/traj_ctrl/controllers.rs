//! # Trajectory controllers module
//!
//! This module provides the tracking control laws used by TrajCtrl, along
//! with the per-wheel PID and feedforward used when driving by voltage.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::{Deserialize, Serialize};

// Internal
use super::TrajectoryState;
use crate::kinematics::ChassisSpeeds;
use crate::loc::Pose2D;
use util::maths::{sign, sinc};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A control law which keeps the robot on a trajectory.
pub trait TrackingController {
    /// Calculate the chassis speeds needed to converge `pose` onto
    /// `reference`.
    fn calculate(&mut self, pose: &Pose2D, reference: &TrajectoryState) -> ChassisSpeeds;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Nonlinear RAMSETE tracking law.
///
/// See "Control of Wheeled Mobile Robots: An Experimental Overview",
/// section 5.12, for the derivation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RamseteController {
    /// Convergence gain, larger values converge more aggressively.
    ///
    /// Units: radians^2/meters^2
    pub b: f64,

    /// Damping, between 0 and 1.
    pub zeta: f64,
}

/// Follows the reference velocities with no feedback at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedForwardController;

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Time the previous error was passed in
    prev_time_s: Option<f64>,

    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// Gains for a [`PidController`], as loaded from a parameter file.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PidGains {
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,
}

/// Permanent magnet DC motor feedforward,
/// `V = k_s * sign(v) + k_v * v + k_a * a`.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct SimpleMotorFeedforward {
    /// Static friction voltage.
    ///
    /// Units: volts
    pub ks_v: f64,

    /// Units: volts/(meters/second)
    pub kv_vspm: f64,

    /// Units: volts/(meters/second^2)
    pub ka_vspmm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RamseteController {
    pub fn new(b: f64, zeta: f64) -> Self {
        Self { b, zeta }
    }
}

impl Default for RamseteController {
    fn default() -> Self {
        Self::new(2.0, 0.7)
    }
}

impl TrackingController for RamseteController {
    fn calculate(&mut self, pose: &Pose2D, reference: &TrajectoryState) -> ChassisSpeeds {
        let v_ref_ms = reference.velocity_ms;
        let omega_ref_rads = reference.angular_velocity_rads;

        // With no convergence gain there is no correction to make
        if self.b == 0.0 {
            return ChassisSpeeds::new(v_ref_ms, omega_ref_rads);
        }

        // Error in the robot's frame
        let error = reference.pose.relative_to(pose);
        let e_x_m = error.position_m[0];
        let e_y_m = error.position_m[1];
        let e_theta_rad = error.heading_rad;

        let k = 2.0
            * self.zeta
            * (omega_ref_rads * omega_ref_rads + self.b * v_ref_ms * v_ref_ms).sqrt();

        trace!(
            "RAMSETE error ({:.3} m, {:.3} m, {:.3} rad), k = {:.3}",
            e_x_m,
            e_y_m,
            e_theta_rad,
            k
        );

        ChassisSpeeds::new(
            v_ref_ms * e_theta_rad.cos() + k * e_x_m,
            omega_ref_rads + k * e_theta_rad + self.b * v_ref_ms * sinc(e_theta_rad) * e_y_m,
        )
    }
}

impl TrackingController for FeedForwardController {
    fn calculate(&mut self, _pose: &Pose2D, reference: &TrajectoryState) -> ChassisSpeeds {
        ChassisSpeeds::new(reference.velocity_ms, reference.angular_velocity_rads)
    }
}

impl<T: TrackingController + ?Sized> TrackingController for Box<T> {
    fn calculate(&mut self, pose: &Pose2D, reference: &TrajectoryState) -> ChassisSpeeds {
        (**self).calculate(pose, reference)
    }
}

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0f64,
            prev_time_s: None,
            prev_error: None,
        }
    }

    /// Create a new controller from a set of gains.
    pub fn from_gains(gains: &PidGains) -> Self {
        Self::new(gains.k_p, gains.k_i, gains.k_d)
    }

    /// Get the value of the controller for the given error at time `now_s`.
    pub fn get(&mut self, error: f64, now_s: f64) -> f64 {
        // Calculate dt, a zero or negative dt is treated as no time passing
        let dt = match self.prev_time_s {
            Some(t0) if now_s > t0 => Some(now_s - t0),
            _ => None,
        };

        // Accumulate the integral term.
        //
        // If there's no time difference then we don't accumulate the integral,
        // adding the raw error would produce a large spike compared to normal
        // operation.
        self.integral += match dt {
            Some(t) => error * t,
            None => 0f64,
        };

        // Calculate the derivative, again zero with no time difference. The
        // first error is taken to have come from zero.
        let deriv = match dt {
            Some(t) => (error - self.prev_error.unwrap_or(0f64)) / t,
            None => 0f64,
        };

        // Calculate the output
        let out = self.k_p * error + self.k_i * self.integral + self.k_d * deriv;

        // Remember the previous error and time
        self.prev_error = Some(error);
        self.prev_time_s = Some(now_s);

        out
    }

    /// Forget all history, keeping the gains.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
        self.prev_time_s = None;
    }
}

impl SimpleMotorFeedforward {
    pub fn new(ks_v: f64, kv_vspm: f64, ka_vspmm: f64) -> Self {
        Self {
            ks_v,
            kv_vspm,
            ka_vspmm,
        }
    }

    /// Voltage needed to hold `velocity_ms` while accelerating at
    /// `acceleration_mss`.
    ///
    /// Units: volts
    pub fn calculate(&self, velocity_ms: f64, acceleration_mss: f64) -> f64 {
        self.ks_v * sign(velocity_ms) + self.kv_vspm * velocity_ms + self.ka_vspmm * acceleration_mss
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn reference(x_m: f64, y_m: f64, heading_rad: f64, v_ms: f64, omega_rads: f64) -> TrajectoryState {
        TrajectoryState {
            pose: Pose2D::new(x_m, y_m, heading_rad),
            velocity_ms: v_ms,
            angular_velocity_rads: omega_rads,
            ..Default::default()
        }
    }

    #[test]
    fn test_ramsete_no_error_is_passthrough() {
        let mut ctrl = RamseteController::new(2.0, 0.7);

        // Stationary target sat on the robot
        let pose = Pose2D::new(1.0, 2.0, 0.5);
        let out = ctrl.calculate(&pose, &reference(1.0, 2.0, 0.5, 0.0, 0.0));
        assert_eq!(out, ChassisSpeeds::new(0.0, 0.0));

        // Moving target sat on the robot
        let out = ctrl.calculate(&pose, &reference(1.0, 2.0, 0.5, 1.2, -0.3));
        assert_relative_eq!(out.linear_ms, 1.2, epsilon = 1e-12);
        assert_relative_eq!(out.angular_rads, -0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_ramsete_zero_b_is_passthrough() {
        let mut ctrl = RamseteController::new(0.0, 0.7);
        let out = ctrl.calculate(&Pose2D::new(0.0, 0.0, 0.0), &reference(1.0, 1.0, 1.0, 0.8, 0.2));
        assert_eq!(out, ChassisSpeeds::new(0.8, 0.2));
    }

    #[test]
    fn test_ramsete_corrects_towards_reference() {
        let mut ctrl = RamseteController::default();
        let pose = Pose2D::new(0.0, 0.0, 0.0);

        // Reference ahead, speed up
        let out = ctrl.calculate(&pose, &reference(0.2, 0.0, 0.0, 1.0, 0.0));
        assert!(out.linear_ms > 1.0);
        assert_relative_eq!(out.angular_rads, 0.0);

        // Reference to the left, turn left
        let out = ctrl.calculate(&pose, &reference(0.0, 0.2, 0.0, 1.0, 0.0));
        assert!(out.angular_rads > 0.0);

        // Reference heading to the right, turn right
        let out = ctrl.calculate(&pose, &reference(0.0, 0.0, -0.2, 1.0, 0.0));
        assert!(out.angular_rads < 0.0);
    }

    #[test]
    fn test_feedforward_controller() {
        let mut ctrl = FeedForwardController;
        let out = ctrl.calculate(&Pose2D::new(5.0, 5.0, 2.0), &reference(0.0, 0.0, 0.0, 0.4, 0.1));
        assert_eq!(out, ChassisSpeeds::new(0.4, 0.1));
    }

    #[test]
    fn test_pid() {
        let mut pid = PidController::new(2.0, 1.0, 0.5);

        // First call has no time history
        assert_relative_eq!(pid.get(1.0, 0.0), 2.0);

        // Second call, 0.5 s later with the same error
        // P = 2, I = 1 * 0.5, D = 0
        assert_relative_eq!(pid.get(1.0, 0.5), 2.5);

        // Error drops to zero
        // P = 0, I = 0.5, D = 0.5 * (0 - 1) / 0.5
        assert_relative_eq!(pid.get(0.0, 1.0), -0.5);

        // Repeating a timestamp adds nothing
        assert_relative_eq!(pid.get(0.0, 1.0), 0.5);

        pid.reset();
        assert_relative_eq!(pid.get(0.0, 2.0), 0.0);
    }

    #[test]
    fn test_simple_motor_feedforward() {
        let ff = SimpleMotorFeedforward::new(0.5, 2.0, 0.25);
        assert_relative_eq!(ff.calculate(1.0, 0.0), 2.5);
        assert_relative_eq!(ff.calculate(-1.0, 2.0), -2.0);
        assert_relative_eq!(ff.calculate(0.0, 0.0), 0.0);
    }
}
