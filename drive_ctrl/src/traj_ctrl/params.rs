//! Parameters structure for TrajCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::{LtvParams, PidGains, SimpleMotorFeedforward, TrajCtrlError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Trajectory control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- CONTROL LAW ----
    /// The tracking control law to use.
    pub controller: ControllerParams,

    /// Kind of demand produced.
    #[serde(default)]
    pub output_mode: OutputMode,

    // ---- LIMITS ----
    /// Largest wheel speed demanded, faster pairs are scaled down keeping
    /// their ratio.
    ///
    /// Units: meters/second
    pub max_wheel_speed_ms: f64,

    // ---- VOLTAGE MODE ----
    /// Feedforward for each side, used in voltage mode.
    #[serde(default)]
    pub feedforward: SimpleMotorFeedforward,

    /// PID gains on each side's velocity error, used in voltage mode.
    #[serde(default)]
    pub wheel_pid: PidGains,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Choice of tracking control law.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type")]
pub enum ControllerParams {
    /// RAMSETE with convergence `b` and damping `zeta`.
    Ramsete { b: f64, zeta: f64 },

    /// LTV unicycle.
    Ltv(LtvParams),

    /// Reference velocities only.
    FeedForward,
}

/// Kind of demand TrajCtrl produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum OutputMode {
    /// Wheel velocities, executed by the motor controllers' own loops.
    Velocity,

    /// Voltages from the feedforward plus a PID on measured wheel speed.
    Voltage,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Velocity
    }
}

impl Params {
    /// Check the wheel speed limit and, if RAMSETE is used, its gains.
    ///
    /// A `b` of zero is allowed and gives no correction at all. The LTV
    /// parameters are checked when its controller is built.
    pub fn validate(&self) -> Result<(), TrajCtrlError> {
        if !(self.max_wheel_speed_ms > 0.0) {
            return Err(TrajCtrlError::InvalidMaxWheelSpeed(self.max_wheel_speed_ms));
        }

        if let ControllerParams::Ramsete { b, zeta } = self.controller {
            if !(b >= 0.0 && b.is_finite()) || !(zeta > 0.0 && zeta < 1.0) {
                return Err(TrajCtrlError::InvalidRamseteParams(b, zeta));
            }
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            controller: ControllerParams::Ramsete { b: 2.0, zeta: 0.7 },
            output_mode: OutputMode::Velocity,
            max_wheel_speed_ms: 3.0,
            feedforward: SimpleMotorFeedforward::default(),
            wheel_pid: PidGains::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_params() {
        let params: Params = util::params::from_str(
            r#"
            output_mode = "Voltage"
            max_wheel_speed_ms = 2.5

            [controller]
            type = "Ltv"
            q_tolerances = [0.0625, 0.125, 2.0]
            r_tolerances = [1.0, 2.0]
            dt_s = 0.02

            [feedforward]
            ks_v = 0.6
            kv_vspm = 2.2
            ka_vspmm = 0.3

            [wheel_pid]
            k_p = 1.5
            k_i = 0.0
            k_d = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(params.output_mode, OutputMode::Voltage);
        assert!(matches!(params.controller, ControllerParams::Ltv(p) if p.dt_s == 0.02));
        assert_eq!(params.wheel_pid.k_p, 1.5);

        let params: Params = util::params::from_str(
            r#"
            max_wheel_speed_ms = 3.0

            [controller]
            type = "Ramsete"
            b = 2.0
            zeta = 0.7
            "#,
        )
        .unwrap();
        assert_eq!(params.output_mode, OutputMode::Velocity);
        assert!(matches!(params.controller, ControllerParams::Ramsete { b, .. } if b == 2.0));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let ramsete = |b, zeta| Params {
            controller: ControllerParams::Ramsete { b, zeta },
            ..Default::default()
        };

        assert!(Params::default().validate().is_ok());

        // No convergence gain is the passthrough case
        assert!(ramsete(0.0, 0.7).validate().is_ok());

        for (b, zeta) in [
            (-2.0, 0.7),
            (f64::NAN, 0.7),
            (f64::INFINITY, 0.7),
            (2.0, 0.0),
            (2.0, 1.0),
            (2.0, -0.5),
            (2.0, f64::NAN),
        ]
        .iter()
        {
            assert!(matches!(
                ramsete(*b, *zeta).validate(),
                Err(TrajCtrlError::InvalidRamseteParams(_, _))
            ));
        }

        for max_ms in [0.0, -0.5, f64::NAN].iter() {
            let params = Params {
                max_wheel_speed_ms: *max_ms,
                ..Default::default()
            };
            assert!(matches!(
                params.validate(),
                Err(TrajCtrlError::InvalidMaxWheelSpeed(_))
            ));
        }

        // Only RAMSETE has gains to check here
        let params = Params {
            controller: ControllerParams::FeedForward,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }
}
