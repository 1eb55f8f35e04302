//! # Drive utility functions
//!
//! Pure functions used to shape the driver's joystick input before it is
//! turned into wheel outputs. None of these hold any state.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use util::maths::{clamp, sign};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the turn input is combined with the speed input.
///
/// The two modes only differ when driving in reverse. With `Absolute` a
/// positive turn input always rotates the chassis the same way, with `Signed`
/// the rotation flips when reversing, as a car's would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CurvatureMode {
    /// `|speed| * turn + trim`
    Absolute,

    /// `speed * turn + trim`
    Signed,
}

impl Default for CurvatureMode {
    fn default() -> Self {
        CurvatureMode::Absolute
    }
}

impl CurvatureMode {
    /// Combine the inputs according to this mode.
    pub fn apply(&self, speed: f64, turn: f64, trim: f64) -> f64 {
        match self {
            CurvatureMode::Absolute => constant_curvature(speed, turn, trim),
            CurvatureMode::Signed => signed_curvature(speed, turn, trim),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Remove the deadband from an input.
///
/// Inputs inside the deadband become zero. Outside it the input is rescaled by
/// `smoothing / (1 - deadband)` so the output starts from zero at the edge of
/// the band, and is then clamped so it never exceeds the input's magnitude.
pub fn process_deadband(input: f64, deadband: f64, smoothing: f64) -> f64 {
    let magnitude = input.abs();

    if magnitude < deadband {
        return 0.0;
    }

    sign(input) * clamp(smoothing / (1.0 - deadband) * (magnitude - deadband), 0.0, magnitude)
}

/// Square an input while keeping its sign.
pub fn square_input(input: f64) -> f64 {
    sign(input) * input * input
}

/// Turn output whose authority scales with the magnitude of the speed.
pub fn constant_curvature(speed: f64, turn: f64, trim: f64) -> f64 {
    speed.abs() * turn + trim
}

/// Turn output whose authority scales with the signed speed.
pub fn signed_curvature(speed: f64, turn: f64, trim: f64) -> f64 {
    speed * turn + trim
}

/// Scale a pair of outputs so that neither exceeds a magnitude of 1.
///
/// The ratio between the two is kept. Pairs already within range are returned
/// unchanged.
pub fn normalize_values(a: f64, b: f64) -> (f64, f64) {
    let max = a.abs().max(b.abs());

    if max > 1.0 {
        (a / max, b / max)
    } else {
        (a, b)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-3;

    #[test]
    fn test_deadband_zero_band() {
        assert_eq!(process_deadband(0.15, 0.25, 1.0), 0.0);
        assert_eq!(process_deadband(-0.2, 0.25, 1.0), 0.0);
        assert_eq!(process_deadband(0.0, 0.1, 2.0), 0.0);

        for i in -99..100 {
            let x = i as f64 * 0.001;
            assert_eq!(process_deadband(x, 0.1, 1.5), 0.0);
        }
    }

    #[test]
    fn test_deadband_outside_band() {
        // Clamped to the input magnitude
        assert_relative_eq!(process_deadband(0.3, 0.1, 1.5), 0.3);
        assert_relative_eq!(process_deadband(-0.3, 0.1, 1.5), -0.3);

        assert_relative_eq!(process_deadband(0.15, 0.1, 2.0), 0.111, epsilon = EPSILON);
        assert_relative_eq!(process_deadband(0.8, 0.1, 1.0), 0.777, epsilon = EPSILON);
        assert_relative_eq!(process_deadband(-0.8, 0.1, 1.0), -0.777, epsilon = EPSILON);
        assert_relative_eq!(process_deadband(1.0, 0.07, 1.0), 1.0);
    }

    #[test]
    fn test_deadband_sign_and_magnitude() {
        for i in -100..=100 {
            let x = i as f64 * 0.01;
            for &(deadband, smoothing) in &[(0.07, 1.0), (0.1, 1.5), (0.2, 3.0), (0.05, 0.5)] {
                let y = process_deadband(x, deadband, smoothing);
                assert!(y.abs() <= x.abs());
                if y != 0.0 {
                    assert_eq!(y.signum(), x.signum());
                }
            }
        }
    }

    #[test]
    fn test_deadband_continuous_at_edge() {
        let just_outside = process_deadband(0.1 + 1e-9, 0.1, 1.0);
        assert_relative_eq!(just_outside, 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_square_input() {
        assert_relative_eq!(square_input(0.5), 0.25);
        assert_relative_eq!(square_input(-0.5), -0.25);
        assert_eq!(square_input(0.0), 0.0);

        for i in -50..=50 {
            let x = i as f64 * 0.02;
            assert_eq!(square_input(-x), -square_input(x));
        }
    }

    #[test]
    fn test_curvature() {
        assert_relative_eq!(constant_curvature(-1.0, -0.5, 0.0), -0.5);
        assert_relative_eq!(constant_curvature(0.5, 0.5, 0.1), 0.35);
        assert_relative_eq!(signed_curvature(0.5, 0.5, 0.1), 0.35);

        // The two modes only disagree in reverse
        assert_relative_eq!(CurvatureMode::Absolute.apply(-0.8, 0.5, 0.0), 0.4);
        assert_relative_eq!(CurvatureMode::Signed.apply(-0.8, 0.5, 0.0), -0.4);
        assert_relative_eq!(
            CurvatureMode::Absolute.apply(0.8, 0.5, 0.05),
            CurvatureMode::Signed.apply(0.8, 0.5, 0.05)
        );

        assert_eq!(CurvatureMode::default(), CurvatureMode::Absolute);
    }

    #[test]
    fn test_normalize() {
        let (a, b) = normalize_values(1.2, 0.5);
        assert_relative_eq!(a, 1.0);
        assert_relative_eq!(b, 0.5 / 1.2);

        let (a, b) = normalize_values(-1.6, 0.3);
        assert_relative_eq!(a, -1.0);
        assert_relative_eq!(b, 0.3 / 1.6);

        assert_eq!(normalize_values(0.4, -1.0), (0.4, -1.0));
        assert_eq!(normalize_values(0.0, 0.0), (0.0, 0.0));

        for i in -20..=20 {
            for j in -20..=20 {
                let (a, b) = (i as f64 * 0.15, j as f64 * 0.1);
                let (na, nb) = normalize_values(a, b);
                assert!(na.abs().max(nb.abs()) <= 1.0 + 1e-12);
                if a.abs().max(b.abs()) <= 1.0 {
                    assert_eq!((na, nb), (a, b));
                }
            }
        }
    }
}
