//! # Localisation module
//!
//! This module provides localisation for the robot in the form of wheel
//! odometry fused with an absolute heading, along with the pose types used by
//! the rest of the control core.
//!
//! All poses are of the robot body in the fixed field frame. Headings are
//! counter-clockwise positive, with zero along the field's +X axis.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod odometry;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// Internal
pub use odometry::*;
use util::maths::{ang_dist, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The position and heading of the robot in the field frame.
///
/// Poses are values, every update produces a new one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// The position in the field frame.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading from the field +X axis, counter-clockwise positive.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// A small motion along an arc, expressed in the body frame at its start.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Twist2D {
    /// Units: meters
    pub dx_m: f64,

    /// Units: meters
    pub dy_m: f64,

    /// Units: radians
    pub dtheta_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Pose2D {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl Pose2D {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }

    /// Unit vector pointing along the heading.
    pub fn forward(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }

    /// Express this pose in the frame of `origin`.
    ///
    /// The result's heading is wrapped into `(-pi, pi]`.
    pub fn relative_to(&self, origin: &Pose2D) -> Pose2D {
        let delta_m = Rotation2::new(-origin.heading_rad) * (self.position_m - origin.position_m);

        Pose2D {
            position_m: delta_m,
            heading_rad: ang_dist(origin.heading_rad, self.heading_rad),
        }
    }

    /// Apply a transform expressed in this pose's own frame.
    ///
    /// This is the inverse of [`Pose2D::relative_to`], so
    /// `origin.transform_by(&p.relative_to(&origin)) == p`.
    pub fn transform_by(&self, transform: &Pose2D) -> Pose2D {
        Pose2D {
            position_m: self.position_m + Rotation2::new(self.heading_rad) * transform.position_m,
            heading_rad: wrap_pi(self.heading_rad + transform.heading_rad),
        }
    }

    /// Follow the constant curvature arc described by `twist` from this pose.
    pub fn exp(&self, twist: &Twist2D) -> Pose2D {
        let dtheta = twist.dtheta_rad;
        let sin_theta = dtheta.sin();
        let cos_theta = dtheta.cos();

        // Series expansion near zero, where sin(x)/x and (1 - cos(x))/x both
        // lose precision
        let (s, c) = if dtheta.abs() < 1e-9 {
            (1.0 - dtheta * dtheta / 6.0, 0.5 * dtheta)
        } else {
            (sin_theta / dtheta, (1.0 - cos_theta) / dtheta)
        };

        let transform = Pose2D::new(
            twist.dx_m * s - twist.dy_m * c,
            twist.dx_m * c + twist.dy_m * s,
            dtheta,
        );

        self.transform_by(&transform)
    }

    /// Straight line distance between the two poses' positions.
    ///
    /// Units: meters
    pub fn distance_to(&self, other: &Pose2D) -> f64 {
        (other.position_m - self.position_m).norm()
    }

    /// Interpolate between this pose (`t = 0`) and `other` (`t = 1`).
    ///
    /// Position is interpolated linearly and heading along the shortest arc.
    pub fn interpolate(&self, other: &Pose2D, t: f64) -> Pose2D {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *other;
        }

        Pose2D {
            position_m: self.position_m + (other.position_m - self.position_m) * t,
            heading_rad: wrap_pi(
                self.heading_rad + ang_dist(self.heading_rad, other.heading_rad) * t,
            ),
        }
    }
}

impl Twist2D {
    pub fn new(dx_m: f64, dy_m: f64, dtheta_rad: f64) -> Self {
        Self {
            dx_m,
            dy_m,
            dtheta_rad,
        }
    }
}
