//! Profile control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{ProfileCtrlError, ProfileMove};
use crate::eqpt::{MotionProfile, Neutral};
use util::module::{State, Stop};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Profile control module state
///
/// Owns the mechanism, which is put in neutral when a move finishes, is
/// aborted or stopped, and when the module is dropped.
pub struct ProfileCtrl<M>
where
    M: MotionProfile + Neutral,
{
    mechanism: M,

    mode: ProfileCtrlMode,

    /// The move being made
    current: Option<ProfileMove>,
}

/// Data needed to initialise ProfileCtrl.
pub struct InitData<M> {
    pub mechanism: M,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize)]
pub struct OutputData {
    /// If true the move finished this cycle.
    pub finished: bool,
}

#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Measured position of the mechanism.
    pub position: f64,

    /// Target and remaining error of the move, if one is running.
    pub target: Option<f64>,
    pub error: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProfileCtrlMode {
    /// No move running, the mechanism is in neutral.
    Idle,

    /// The mechanism is profiling to a target.
    Moving,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<M> State for ProfileCtrl<M>
where
    M: MotionProfile + Neutral,
{
    type InitData = InitData<M>;
    type InitError = ProfileCtrlError;

    type InputData = ();
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = ProfileCtrlError;

    /// Initialise ProfileCtrl with the mechanism in neutral.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        let mut mechanism = init_data.mechanism;
        mechanism.neutral();

        Ok(Self {
            mechanism,
            mode: ProfileCtrlMode::Idle,
            current: None,
        })
    }

    /// Check whether the running move has reached its target.
    ///
    /// The target is read back from the mechanism, so a target changed
    /// underneath the module is still waited for.
    fn proc(
        &mut self,
        _: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let position = self.mechanism.get_profile_position();
        let mut report = StatusReport {
            position,
            ..Default::default()
        };

        let allowed_error = match (self.mode, self.current) {
            (ProfileCtrlMode::Moving, Some(m)) => m.allowed_error,
            _ => return Ok((OutputData::default(), report)),
        };

        let target = self.mechanism.get_profile_target();
        let error = target - position;
        report.target = Some(target);
        report.error = Some(error);

        let finished = error.abs() < allowed_error;
        if finished {
            debug!(
                "Move to {:.3} finished at {:.3}, error {:.3}",
                target, position, error
            );
            self.set_idle();
        }

        Ok((OutputData { finished }, report))
    }
}

impl<M> Stop for ProfileCtrl<M>
where
    M: MotionProfile + Neutral,
{
    /// Drop any move and put the mechanism in neutral.
    fn stop(&mut self) -> Self::OutputData {
        if self.mode != ProfileCtrlMode::Idle {
            info!("ProfileCtrl stopped");
        }
        self.set_idle();
        OutputData::default()
    }
}

impl<M> Drop for ProfileCtrl<M>
where
    M: MotionProfile + Neutral,
{
    fn drop(&mut self) {
        self.mechanism.neutral();
    }
}

impl<M> ProfileCtrl<M>
where
    M: MotionProfile + Neutral,
{
    /// Start a move.
    ///
    /// The limits are configured before the target is set. Starting while a
    /// move is running is an error, call `abort` first.
    pub fn begin(&mut self, profile_move: ProfileMove) -> Result<(), ProfileCtrlError> {
        if self.mode == ProfileCtrlMode::Moving {
            return Err(ProfileCtrlError::MoveAlreadyRunning);
        }
        profile_move.validate()?;

        info!(
            "Moving to {:.3} (cruise {:.3}, acceleration {:.3})",
            profile_move.target, profile_move.cruise_velocity, profile_move.acceleration
        );

        self.mechanism
            .config_motion_profile(profile_move.cruise_velocity, profile_move.acceleration);
        self.mechanism.set_position_target(profile_move.target);

        self.current = Some(profile_move);
        self.mode = ProfileCtrlMode::Moving;

        Ok(())
    }

    /// Abort the running move, putting the mechanism in neutral.
    pub fn abort(&mut self) {
        if self.mode == ProfileCtrlMode::Moving {
            warn!("Move aborted");
            self.set_idle();
        }
    }

    pub fn mode(&self) -> ProfileCtrlMode {
        self.mode
    }

    /// The move being made, if any.
    pub fn current_move(&self) -> Option<ProfileMove> {
        self.current
    }

    fn set_idle(&mut self) {
        self.mode = ProfileCtrlMode::Idle;
        self.current = None;
        self.mechanism.neutral();
    }
}
