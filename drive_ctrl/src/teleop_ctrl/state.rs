//! Implementations for the TeleopCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;

// Internal
use super::{DriveSignal, Params, TeleopCtrlError};
use crate::drive_util::{normalize_values, process_deadband, square_input};
use crate::slew::DynamicSlewRateLimiter;
use util::module::{State, Stop};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Teleop control module state
pub struct TeleopCtrl {
    params: Params,

    /// Limiter on the speed term
    speed_limiter: DynamicSlewRateLimiter,

    /// Time of the most recent cycle.
    ///
    /// Units: seconds
    last_time_s: f64,
}

/// Data needed to initialise TeleopCtrl.
pub struct InitData {
    pub params: Params,

    /// Current time from the control loop's clock.
    ///
    /// Units: seconds
    pub time_s: f64,
}

/// Input data to Teleop Control.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    pub signal: DriveSignal,

    /// Units: seconds
    pub time_s: f64,
}

/// Output fractions for each side, between -1 and +1.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct OutputData {
    pub left: f64,
    pub right: f64,
}

/// Status report for TeleopCtrl processing.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    /// Speed term after slew rate limiting.
    pub slewed_speed: f64,

    /// If true the speed term was held back by the slew rate limiter.
    pub speed_rate_limited: bool,

    /// If true the outputs were scaled down to fit between -1 and +1.
    pub normalised: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TeleopCtrl {
    type InitData = InitData;
    type InitError = TeleopCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = TeleopCtrlError;

    /// Initialise the TeleopCtrl module, checking the rate limits.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        let speed_limiter =
            DynamicSlewRateLimiter::new(init_data.params.speed_rate_limits, init_data.time_s)?;

        Ok(Self {
            params: init_data.params,
            speed_limiter,
            last_time_s: init_data.time_s,
        })
    }

    /// Perform cyclic processing of Teleop Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut report = StatusReport::default();
        let p = &self.params;
        let signal = &input_data.signal;

        // Deadband
        let mut speed = process_deadband(signal.speed, p.deadband, p.deadband_smoothing);
        let mut turn = process_deadband(signal.turn, p.deadband, p.deadband_smoothing);
        let mut trim = process_deadband(signal.trim, p.deadband, p.deadband_smoothing);

        // Slow mode replaces squaring
        if signal.slow {
            speed *= p.slow_speed;
            turn *= p.slow_speed;
            trim *= p.slow_speed;
        } else if p.square_inputs {
            speed = square_input(speed);
            turn = square_input(turn);
            trim = square_input(trim);
        }

        speed *= p.speed_adjustment;
        turn *= p.turn_adjustment;
        trim *= p.trim_adjustment;

        // Only the speed is rate limited, steering responds immediately
        let slewed_speed = self.speed_limiter.calculate(speed, input_data.time_s)?;
        self.last_time_s = input_data.time_s;
        report.slewed_speed = slewed_speed;
        report.speed_rate_limited = slewed_speed != speed;

        let turn_out = p.curvature_mode.apply(slewed_speed, turn, trim);

        let raw_left = slewed_speed - turn_out;
        let raw_right = slewed_speed + turn_out;
        let (left, right) = normalize_values(raw_left, raw_right);
        report.normalised = (left, right) != (raw_left, raw_right);

        trace!(
            "TeleopCtrl: {:?} -> ({:.3}, {:.3})",
            signal,
            left,
            right
        );

        Ok((OutputData { left, right }, report))
    }
}

impl Stop for TeleopCtrl {
    /// Zero the speed limiter so the next drive starts from rest.
    fn stop(&mut self) -> Self::OutputData {
        if self.speed_limiter.last_value() != 0.0 {
            debug!("TeleopCtrl stopped");
        }
        self.speed_limiter.reset(0.0, self.last_time_s);
        OutputData::default()
    }
}

impl TeleopCtrl {
    /// Restart the limiter from rest at `time_s`, used when teleop becomes
    /// the active drive mode after some time disabled.
    pub fn restart(&mut self, time_s: f64) {
        self.speed_limiter.reset(0.0, time_s);
        self.last_time_s = time_s;
    }
}
