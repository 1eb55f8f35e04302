//! # Linear time-varying unicycle controller
//!
//! Linearises the unicycle model about the reference velocity each cycle,
//! discretises it at the control period and solves the discrete algebraic
//! Riccati equation (DARE) for the infinite horizon LQR gain.
//!
//! The error state is `[x, y, heading]` in the robot frame and the input is
//! `[linear velocity, angular velocity]`. Linearised about a forward velocity
//! `v` the continuous model is
//!
//! ```text
//!     A = [0 0 0]    B = [1 0]
//!         [0 0 v]        [0 0]
//!         [0 0 0]        [0 1]
//! ```
//!
//! `A` is nilpotent so the zero order hold discretisation is exact with two
//! terms.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Matrix2, Matrix2x3, Matrix3, Matrix3x2, Vector2, Vector3};
use serde::Deserialize;

// Internal
use super::{TrackingController, TrajCtrlError, TrajectoryState};
use crate::kinematics::ChassisSpeeds;
use crate::loc::Pose2D;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest linearisation velocity magnitude, below which the model loses
/// controllability of the lateral error.
///
/// Units: meters/second
const MIN_LINEARISATION_VEL_MS: f64 = 1e-4;

/// Relative convergence tolerance of the doubling iteration.
const DARE_TOLERANCE: f64 = 1e-10;

/// Iteration cap for the doubling iteration. Convergence is quadratic so this
/// is never reached for a stabilisable system.
const DARE_MAX_ITERATIONS: usize = 100;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the LTV controller.
///
/// The costs are given as the largest acceptable excursion of each state and
/// input (Bryson's rule), `Q = diag(1/q^2)` and `R = diag(1/r^2)`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LtvParams {
    /// Acceptable error in x, y and heading.
    ///
    /// Units: meters, meters, radians
    pub q_tolerances: [f64; 3],

    /// Acceptable effort in linear and angular velocity.
    ///
    /// Units: meters/second, radians/second
    pub r_tolerances: [f64; 2],

    /// Control period the gains are computed for.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// LTV unicycle tracking law.
#[derive(Debug, Clone)]
pub struct LtvUnicycleController {
    q: Matrix3<f64>,
    r: Matrix2<f64>,
    dt_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LtvParams {
    fn default() -> Self {
        Self {
            q_tolerances: [0.0625, 0.125, 2.0],
            r_tolerances: [1.0, 2.0],
            dt_s: 0.02,
        }
    }
}

impl LtvUnicycleController {
    /// Create a new controller, checking that every tolerance and the period
    /// are positive.
    pub fn new(params: &LtvParams) -> Result<Self, TrajCtrlError> {
        let all_positive = params
            .q_tolerances
            .iter()
            .chain(params.r_tolerances.iter())
            .chain(std::iter::once(&params.dt_s))
            .all(|v| *v > 0.0);

        if !all_positive {
            return Err(TrajCtrlError::InvalidLtvParams(*params));
        }

        let q = params.q_tolerances;
        let r = params.r_tolerances;

        Ok(Self {
            q: Matrix3::from_diagonal(&Vector3::new(
                1.0 / (q[0] * q[0]),
                1.0 / (q[1] * q[1]),
                1.0 / (q[2] * q[2]),
            )),
            r: Matrix2::from_diagonal(&Vector2::new(1.0 / (r[0] * r[0]), 1.0 / (r[1] * r[1]))),
            dt_s: params.dt_s,
        })
    }

    /// The LQR gain for the model linearised about `velocity_ms`.
    ///
    /// Returns `None` if the Riccati iteration meets a singular matrix or a
    /// non-finite value, for example when `velocity_ms` is not finite.
    pub fn gain(&self, velocity_ms: f64) -> Option<Matrix2x3<f64>> {
        let (a_d, b_d) = self.discretise(velocity_ms);

        let s = dare(&a_d, &b_d, &self.q, &self.r)?;

        // K = (B^T S B + R)^-1 B^T S A
        let b_t = b_d.transpose();
        let lhs = b_t * s * b_d + self.r;
        Some(lhs.try_inverse()? * b_t * s * a_d)
    }

    /// Discrete model linearised about `velocity_ms`, whose magnitude is
    /// floored at the smallest linearisation velocity.
    fn discretise(&self, velocity_ms: f64) -> (Matrix3<f64>, Matrix3x2<f64>) {
        let v = if velocity_ms.abs() < MIN_LINEARISATION_VEL_MS {
            if velocity_ms < 0.0 {
                -MIN_LINEARISATION_VEL_MS
            } else {
                MIN_LINEARISATION_VEL_MS
            }
        } else {
            velocity_ms
        };

        let mut a = Matrix3::zeros();
        a[(1, 2)] = v;

        let mut b = Matrix3x2::zeros();
        b[(0, 0)] = 1.0;
        b[(2, 1)] = 1.0;

        let dt = self.dt_s;
        let a_d = Matrix3::identity() + a * dt;
        let b_d = b * dt + a * b * (dt * dt / 2.0);

        (a_d, b_d)
    }
}

impl TrackingController for LtvUnicycleController {
    fn calculate(&mut self, pose: &Pose2D, reference: &TrajectoryState) -> ChassisSpeeds {
        let v_ref_ms = reference.velocity_ms;
        let omega_ref_rads = reference.angular_velocity_rads;

        let k = match self.gain(v_ref_ms) {
            Some(k) => k,
            None => return ChassisSpeeds::new(v_ref_ms, omega_ref_rads),
        };

        let error = reference.pose.relative_to(pose);
        let e = Vector3::new(error.position_m[0], error.position_m[1], error.heading_rad);
        let u = k * e;

        trace!(
            "LTV error ({:.3} m, {:.3} m, {:.3} rad), correction ({:.3} m/s, {:.3} rad/s)",
            e[0],
            e[1],
            e[2],
            u[0],
            u[1]
        );

        ChassisSpeeds::new(v_ref_ms + u[0], omega_ref_rads + u[1])
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve the discrete algebraic Riccati equation
/// `S = A^T S A - A^T S B (B^T S B + R)^-1 B^T S A + Q`
/// using the structured doubling algorithm.
///
/// Returns `None` if a singular matrix is met.
fn dare(
    a: &Matrix3<f64>,
    b: &Matrix3x2<f64>,
    q: &Matrix3<f64>,
    r: &Matrix2<f64>,
) -> Option<Matrix3<f64>> {
    let mut a_k = *a;
    let mut g_k = b * r.try_inverse()? * b.transpose();
    let mut h_k1 = *q;

    for _ in 0..DARE_MAX_ITERATIONS {
        let h_k = h_k1;

        // W = I + G H is not symmetric, so the order of the products matters
        let w_inv = (Matrix3::identity() + g_k * h_k).try_inverse()?;
        let v_1 = w_inv * a_k;
        let v_2 = w_inv * g_k;

        g_k += a_k * v_2 * a_k.transpose();
        h_k1 = h_k + v_1.transpose() * h_k * a_k;
        a_k *= v_1;

        if !h_k1.iter().all(|x| x.is_finite()) {
            return None;
        }

        if (h_k1 - h_k).norm() <= DARE_TOLERANCE * h_k1.norm() {
            break;
        }
    }

    Some(h_k1)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn reference(x_m: f64, y_m: f64, heading_rad: f64, v_ms: f64) -> TrajectoryState {
        TrajectoryState {
            pose: Pose2D::new(x_m, y_m, heading_rad),
            velocity_ms: v_ms,
            ..Default::default()
        }
    }

    /// Relative residual of `s` in the DARE for the given system.
    fn riccati_residual(
        a: &Matrix3<f64>,
        b: &Matrix3x2<f64>,
        q: &Matrix3<f64>,
        r: &Matrix2<f64>,
        s: &Matrix3<f64>,
    ) -> f64 {
        let b_t = b.transpose();
        let inner = (b_t * s * b + r).try_inverse().unwrap();
        let rhs = a.transpose() * s * a - a.transpose() * s * b * inner * b_t * s * a + q;
        (s - rhs).norm() / s.norm()
    }

    #[test]
    fn test_gain_solves_riccati_at_any_speed() {
        let ctrl = LtvUnicycleController::new(&LtvParams::default()).unwrap();

        for v_ms in [1.0, -2.0, 0.5, 1e-4, 0.0, -1e-6].iter() {
            let (a, b) = ctrl.discretise(*v_ms);
            let s = dare(&a, &b, &ctrl.q, &ctrl.r).unwrap();

            assert!(riccati_residual(&a, &b, &ctrl.q, &ctrl.r, &s) < 1e-8);

            // The solution is symmetric positive definite
            assert!((s - s.transpose()).norm() <= 1e-9 * s.norm());
            assert!(s.symmetric_eigenvalues().iter().all(|l| *l > 0.0));

            // And the gain is the one built from it
            let k = ctrl.gain(*v_ms).unwrap();
            let b_t = b.transpose();
            let expected = (b_t * s * b + ctrl.r).try_inverse().unwrap() * b_t * s * a;
            for (k, expected) in k.iter().zip(expected.iter()) {
                assert_relative_eq!(*k, *expected, epsilon = 1e-9, max_relative = 1e-9);
            }
        }

        assert!(ctrl.gain(f64::NAN).is_none());
    }

    #[test]
    fn test_dare_satisfies_riccati() {
        let ctrl = LtvUnicycleController::new(&LtvParams::default()).unwrap();

        let mut a = Matrix3::identity();
        a[(1, 2)] = 0.02;
        let mut b = Matrix3x2::zeros();
        b[(0, 0)] = 0.02;
        b[(1, 1)] = 0.0002;
        b[(2, 1)] = 0.02;

        let s = dare(&a, &b, &ctrl.q, &ctrl.r).unwrap();

        let b_t = b.transpose();
        let inner = (b_t * s * b + ctrl.r).try_inverse().unwrap();
        let rhs = a.transpose() * s * a - a.transpose() * s * b * inner * b_t * s * a + ctrl.q;

        for (lhs, rhs) in s.iter().zip(rhs.iter()) {
            assert_relative_eq!(*lhs, *rhs, epsilon = 1e-6, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_invalid_params() {
        let mut params = LtvParams::default();
        params.dt_s = 0.0;
        assert!(LtvUnicycleController::new(&params).is_err());

        let mut params = LtvParams::default();
        params.q_tolerances[1] = -0.1;
        assert!(LtvUnicycleController::new(&params).is_err());
    }

    #[test]
    fn test_zero_error_is_passthrough() {
        let mut ctrl = LtvUnicycleController::new(&LtvParams::default()).unwrap();
        let pose = Pose2D::new(2.0, -1.0, 0.4);

        let mut target = reference(2.0, -1.0, 0.4, 1.5);
        target.angular_velocity_rads = 0.3;

        let out = ctrl.calculate(&pose, &target);
        assert_relative_eq!(out.linear_ms, 1.5, epsilon = 1e-12);
        assert_relative_eq!(out.angular_rads, 0.3, epsilon = 1e-12);

        // Also when stationary, where the model is floored
        let out = ctrl.calculate(&pose, &reference(2.0, -1.0, 0.4, 0.0));
        assert_relative_eq!(out.linear_ms, 0.0, epsilon = 1e-12);
        assert_relative_eq!(out.angular_rads, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_corrects_towards_reference() {
        let mut ctrl = LtvUnicycleController::new(&LtvParams::default()).unwrap();
        let pose = Pose2D::default();

        // Reference ahead, speed up
        let out = ctrl.calculate(&pose, &reference(0.1, 0.0, 0.0, 1.0));
        assert!(out.linear_ms > 1.0);

        // Reference to the left, turn left
        let out = ctrl.calculate(&pose, &reference(0.0, 0.1, 0.0, 1.0));
        assert!(out.angular_rads > 0.0);

        // Reversing with the reference to the left, turn right
        let out = ctrl.calculate(&pose, &reference(0.0, 0.1, 0.0, -1.0));
        assert!(out.angular_rads < 0.0);
    }

    #[test]
    fn test_reduces_lateral_error() {
        let mut ctrl = LtvUnicycleController::new(&LtvParams::default()).unwrap();
        let dt_s = 0.02;
        let v_ms = 1.0;

        // Start 0.3 m to the right of a straight line along field +X
        let mut pose = Pose2D::new(0.0, -0.3, 0.0);

        for i in 0..500 {
            let t_s = i as f64 * dt_s;
            let out = ctrl.calculate(&pose, &reference(v_ms * t_s, 0.0, 0.0, v_ms));
            pose = pose.exp(&crate::loc::Twist2D::new(
                out.linear_ms * dt_s,
                0.0,
                out.angular_rads * dt_s,
            ));
        }

        let t_s = 500.0 * dt_s;
        assert!(pose.position_m[1].abs() < 0.01);
        assert!(pose.heading_rad.abs() < 0.01);
        assert!((pose.position_m[0] - v_ms * t_s).abs() < 0.05);
    }
}
