//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Linearly interpolate between `a` and `b`, `t` of 0 giving `a` and 1 `b`.
pub fn lerp<T>(a: T, b: T, t: T) -> T
where
    T: Float,
{
    a + (b - a) * t
}

/// Constrain `value` to the range `[min, max]`.
///
/// `NaN` is passed through unchanged.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Sign of a value as -1, 0 or +1.
///
/// Unlike `Float::signum` zero (of either sign) maps to zero.
pub fn sign<T>(value: T) -> T
where
    T: Float,
{
    if value > T::zero() {
        T::one()
    } else if value < T::zero() {
        -T::one()
    } else {
        T::zero()
    }
}

/// `sin(x) / x`, continuous through zero.
pub fn sinc<T>(x: T) -> T
where
    T: Float,
{
    // Below this the series expansion is exact to machine precision
    let eps = T::from(1e-9).unwrap_or_else(T::epsilon);

    if x.abs() < eps {
        T::one() - x * x / T::from(6.0).unwrap_or_else(T::one)
    } else {
        x.sin() / x
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the range `(-pi, pi]`.
pub fn wrap_pi<T>(angle_rad: T) -> T
where
    T: Float + FloatConst,
{
    let wrapped = rem_euclid(angle_rad + T::PI(), T::TAU()) - T::PI();

    // rem_euclid gives [-pi, pi), fold the lower bound onto +pi
    if wrapped <= -T::PI() {
        wrapped + T::TAU()
    } else {
        wrapped
    }
}

/// Get the signed shortest angular distance going from `a` to `b`.
pub fn ang_dist<T>(a: T, b: T) -> T
where
    T: Float + FloatConst,
{
    wrap_pi(b - a)
}
