//! # Dynamic slew rate limiter
//!
//! Bounds the rate of change of a scalar signal with separate limits for
//! moving away from zero and moving back towards zero. Driving a chassis this
//! lets acceleration be gentle while braking stays sharp.
//!
//! A limiter holds a single signal's state, it must not be shared between two
//! unrelated signals.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::{Deserialize, Serialize};

// Internal
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pair of rate limits applied by the limiter.
///
/// Units: signal units per second
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimits {
    /// Maximum rate when the signal moves further from zero.
    pub away_from_zero: f64,

    /// Maximum rate when the signal moves back towards zero.
    pub toward_zero: f64,
}

/// Asymmetric slew rate limiter.
pub struct DynamicSlewRateLimiter<S = RateLimits> {
    source: S,
    previous_value: f64,
    previous_time_s: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which provides the rate limits for each call to
/// [`DynamicSlewRateLimiter::calculate`].
///
/// Fixed [`RateLimits`] give the same pair every time, a closure lets the
/// limits vary at runtime (for example with the selected gear or an arm's
/// extension).
pub trait RateLimitSource {
    fn rate_limits(&mut self) -> RateLimits;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors from the slew rate limiter.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SlewError {
    #[error("Rate limits must be non-negative, got away_from_zero = {0}, toward_zero = {1}")]
    NegativeRateLimit(f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RateLimits {
    /// Create a new pair of limits, checking neither is negative.
    pub fn new(away_from_zero: f64, toward_zero: f64) -> Result<Self, SlewError> {
        let limits = Self {
            away_from_zero,
            toward_zero,
        };
        limits.validate()?;
        Ok(limits)
    }

    /// The same limit in both directions.
    pub fn symmetric(rate: f64) -> Result<Self, SlewError> {
        Self::new(rate, rate)
    }

    /// Check that neither limit is negative.
    ///
    /// NaN limits are also rejected.
    pub fn validate(&self) -> Result<(), SlewError> {
        if !(self.away_from_zero >= 0.0) || !(self.toward_zero >= 0.0) {
            return Err(SlewError::NegativeRateLimit(
                self.away_from_zero,
                self.toward_zero,
            ));
        }
        Ok(())
    }
}

impl RateLimitSource for RateLimits {
    fn rate_limits(&mut self) -> RateLimits {
        *self
    }
}

impl<F> RateLimitSource for F
where
    F: FnMut() -> RateLimits,
{
    fn rate_limits(&mut self) -> RateLimits {
        self()
    }
}

impl DynamicSlewRateLimiter<RateLimits> {
    /// Create a limiter with fixed limits, starting from zero at `now_s`.
    pub fn new(limits: RateLimits, now_s: f64) -> Result<Self, SlewError> {
        limits.validate()?;
        Ok(Self::with_source(limits, now_s))
    }

    /// The fixed limits used by this limiter.
    pub fn limits(&self) -> RateLimits {
        self.source
    }
}

impl<S> DynamicSlewRateLimiter<S>
where
    S: RateLimitSource,
{
    /// Create a limiter whose limits are fetched from `source` on every call
    /// to [`DynamicSlewRateLimiter::calculate`].
    ///
    /// The limits are checked each time they are fetched.
    pub fn with_source(source: S, now_s: f64) -> Self {
        Self {
            source,
            previous_value: 0.0,
            previous_time_s: now_s,
        }
    }

    /// Limit `input` and return the new output value.
    ///
    /// `now_s` must come from the same clock used to construct the limiter.
    pub fn calculate(&mut self, input: f64, now_s: f64) -> Result<f64, SlewError> {
        let elapsed_s = now_s - self.previous_time_s;

        let limits = self.source.rate_limits();
        limits.validate()?;

        // Zero counts as positive
        let (positive_limit, negative_limit) = if self.previous_value >= 0.0 {
            (limits.away_from_zero, limits.toward_zero)
        } else {
            (limits.toward_zero, limits.away_from_zero)
        };

        let delta = clamp(
            input - self.previous_value,
            -negative_limit * elapsed_s,
            positive_limit * elapsed_s,
        );

        self.previous_value += delta;
        self.previous_time_s = now_s;

        trace!(
            "Slew: input {:.3}, output {:.3}, dt {:.4} s",
            input,
            self.previous_value,
            elapsed_s
        );

        Ok(self.previous_value)
    }

    /// Set the output to `value` without applying the limits.
    pub fn reset(&mut self, value: f64, now_s: f64) {
        self.previous_value = value;
        self.previous_time_s = now_s;
    }

    /// The most recent output of the limiter.
    pub fn last_value(&self) -> f64 {
        self.previous_value
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    const DT_S: f64 = 0.02;

    #[test]
    fn test_negative_limits_rejected() {
        assert_eq!(
            RateLimits::new(-1.0, 1.0),
            Err(SlewError::NegativeRateLimit(-1.0, 1.0))
        );
        assert!(RateLimits::new(1.0, -0.1).is_err());
        assert!(RateLimits::new(std::f64::NAN, 1.0).is_err());
        assert!(RateLimits::new(0.0, 0.0).is_ok());

        let bad = RateLimits {
            away_from_zero: -2.0,
            toward_zero: 1.0,
        };
        assert!(DynamicSlewRateLimiter::new(bad, 0.0).is_err());
    }

    #[test]
    fn test_negative_dynamic_limits_rejected_on_use() {
        let mut flip = false;
        let source = move || {
            flip = !flip;
            RateLimits {
                away_from_zero: if flip { 1.0 } else { -1.0 },
                toward_zero: 1.0,
            }
        };
        let mut slew = DynamicSlewRateLimiter::with_source(source, 0.0);

        assert!(slew.calculate(1.0, 0.1).is_ok());
        assert_eq!(
            slew.calculate(1.0, 0.2),
            Err(SlewError::NegativeRateLimit(-1.0, 1.0))
        );
    }

    #[test]
    fn test_away_and_toward_limits() {
        let limits = RateLimits::new(1.0, 4.0).unwrap();
        let mut slew = DynamicSlewRateLimiter::new(limits, 0.0).unwrap();

        // Accelerating away from zero at 1/s
        assert_relative_eq!(slew.calculate(1.0, 0.25).unwrap(), 0.25);
        assert_relative_eq!(slew.calculate(1.0, 0.5).unwrap(), 0.5);

        // Braking towards zero at 4/s
        assert_relative_eq!(slew.calculate(-1.0, 0.625).unwrap(), 0.0);

        // Zero counts as positive, so stepping negative from it is limited
        // at the towards zero rate
        assert_relative_eq!(slew.calculate(-1.0, 0.75).unwrap(), -0.5);

        // Below zero the limits swap, further negative is away from zero
        assert_relative_eq!(slew.calculate(-1.0, 1.0).unwrap(), -0.75);

        // and going positive is towards zero
        assert_relative_eq!(slew.calculate(1.0, 1.125).unwrap(), -0.25);
    }

    #[test]
    fn test_rate_never_exceeded() {
        let limits = RateLimits::new(1.5, 3.0).unwrap();
        let mut slew = DynamicSlewRateLimiter::new(limits, 0.0).unwrap();

        let inputs = [1.0, 1.0, -1.0, 0.3, -0.8, 1.0, 0.0, -1.0, -1.0, 0.5];
        let mut prev = slew.last_value();
        let mut t = 0.0;

        for _ in 0..20 {
            for input in inputs.iter() {
                t += DT_S;
                let out = slew.calculate(*input, t).unwrap();
                let rate = (out - prev) / DT_S;

                let away = (prev >= 0.0 && rate > 0.0) || (prev < 0.0 && rate < 0.0);
                let max_rate = if away { 1.5 } else { 3.0 };
                assert!(rate.abs() <= max_rate + 1e-9);

                prev = out;
            }
        }
    }

    #[test]
    fn test_reset() {
        let mut slew = DynamicSlewRateLimiter::new(RateLimits::symmetric(1.0).unwrap(), 0.0).unwrap();

        slew.reset(0.8, 1.0);
        assert_relative_eq!(slew.last_value(), 0.8);

        // Limiting resumes from the reset point
        assert_relative_eq!(slew.calculate(0.0, 1.1).unwrap(), 0.7, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_elapsed_time_holds_output() {
        let mut slew = DynamicSlewRateLimiter::new(RateLimits::symmetric(10.0).unwrap(), 5.0).unwrap();
        assert_relative_eq!(slew.calculate(1.0, 5.0).unwrap(), 0.0);
    }
}
