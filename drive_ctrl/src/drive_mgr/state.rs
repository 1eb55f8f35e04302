//! Implementations for the DriveMgr state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{DriveMgrError, DriveMode, DriveParams};
use crate::cmd::DriveDemand;
use crate::eqpt::{ActuatorPort, HeadingSource};
use crate::loc::{Odometry, Pose2D};
use crate::teleop_ctrl::{self, DriveSignal, TeleopCtrl};
use crate::traj_ctrl::{self, TrajCtrl, TrajCtrlError, TrajCtrlMode, Trajectory};
use crate::units::UnitConverter;
use util::{
    module::{State, Stop},
    time::Clock,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive manager
///
/// Owns the drivetrain hardware and both control modules, see the
/// [module documentation](super) for the cycle and the modes.
pub struct DriveMgr<A, H, C>
where
    A: ActuatorPort,
    H: HeadingSource,
    C: Clock,
{
    params: DriveParams,

    actuator: A,
    heading: H,
    clock: C,

    conv: UnitConverter,
    odometry: Odometry,

    teleop_ctrl: TeleopCtrl,
    traj_ctrl: TrajCtrl,

    mode: DriveMode,
}

/// Data needed to initialise the DriveMgr.
pub struct InitData<A, H, C> {
    pub actuator: A,
    pub heading: H,
    pub clock: C,

    pub params: DriveParams,
    pub teleop_params: teleop_ctrl::Params,
    pub traj_params: traj_ctrl::Params,

    /// Pose the robot starts at.
    pub initial_pose: Pose2D,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct OutputData {
    /// The demand executed this cycle.
    pub demand: DriveDemand,

    /// The pose estimate after this cycle's odometry update.
    pub pose: Pose2D,
}

/// Status report for one DriveMgr cycle.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    /// Units: seconds
    pub time_s: f64,

    /// The mode the cycle ran in.
    pub mode: DriveMode,

    /// TeleopCtrl's report, if it ran.
    pub teleop: Option<teleop_ctrl::StatusReport>,

    /// TrajCtrl's report, if it ran.
    pub traj: Option<traj_ctrl::StatusReport>,

    /// If true the trajectory finished this cycle and the manager is now
    /// disabled.
    pub trajectory_finished: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<A, H, C> State for DriveMgr<A, H, C>
where
    A: ActuatorPort,
    H: HeadingSource,
    C: Clock,
{
    type InitData = InitData<A, H, C>;
    type InitError = DriveMgrError;

    type InputData = DriveSignal;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = DriveMgrError;

    /// Initialise the DriveMgr in the disabled mode.
    ///
    /// The odometry starts at the initial pose from the current wheel
    /// positions and heading, so neither needs to be zeroed beforehand.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        let params = init_data.params;
        params.validate()?;

        if let Some(ltv_dt_s) = params.ltv_period_mismatch(&init_data.traj_params) {
            warn!(
                "LTV gains are computed for a {} s period but the control cycle is {} s",
                ltv_dt_s, params.cycle_period_s
            );
        }

        let conv = UnitConverter::new(params.geometry);
        let time_s = init_data.clock.now_s();

        let teleop_ctrl = TeleopCtrl::init(teleop_ctrl::InitData {
            params: init_data.teleop_params,
            time_s,
        })?;
        let traj_ctrl = TrajCtrl::init(traj_ctrl::InitData {
            params: init_data.traj_params,
            track_width_m: params.geometry.track_width_m,
        })?;

        let heading_deg = init_data.heading.get_heading_deg();
        let (left, right) = init_data.actuator.get_position();
        let mut odometry = Odometry::new(heading_deg, init_data.initial_pose);
        odometry.reset_position(
            init_data.initial_pose,
            heading_deg,
            conv.to_distance(left),
            conv.to_distance(right),
        );

        let mut mgr = Self {
            params,
            actuator: init_data.actuator,
            heading: init_data.heading,
            clock: init_data.clock,
            conv,
            odometry,
            teleop_ctrl,
            traj_ctrl,
            mode: DriveMode::Disabled,
        };
        mgr.actuator.neutral_output();

        info!("DriveMgr initialised");

        Ok(mgr)
    }

    /// Run one control cycle with the driver's latest input.
    ///
    /// The signal is ignored unless the manager is in teleop mode. If a
    /// control module fails the neutral output is commanded before the error
    /// is returned.
    fn proc(
        &mut self,
        signal: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let time_s = self.clock.now_s();

        let mut report = StatusReport {
            time_s,
            mode: self.mode,
            ..Default::default()
        };

        // Odometry runs first in every mode
        let pose = self.update_odometry();

        let demand = match self.mode_demand(signal, time_s, pose, &mut report) {
            Ok(d) => d,
            Err(e) => {
                warn!("DriveMgr processing failed, commanding neutral");
                self.actuator.neutral_output();
                return Err(e);
            }
        };

        demand.execute(
            &mut self.actuator,
            &self.conv,
            self.params.velocity_period_s,
        );

        if report.trajectory_finished {
            info!("Trajectory finished");
            self.set_mode(DriveMode::Disabled);
        }

        Ok((OutputData { demand, pose }, report))
    }
}

impl<A, H, C> Stop for DriveMgr<A, H, C>
where
    A: ActuatorPort,
    H: HeadingSource,
    C: Clock,
{
    /// Disable the drive, commanding the neutral output.
    fn stop(&mut self) -> Self::OutputData {
        self.set_mode(DriveMode::Disabled);
        OutputData {
            demand: DriveDemand::Neutral,
            pose: self.odometry.pose(),
        }
    }
}

impl<A, H, C> Drop for DriveMgr<A, H, C>
where
    A: ActuatorPort,
    H: HeadingSource,
    C: Clock,
{
    fn drop(&mut self) {
        debug!("DriveMgr dropped, commanding neutral");
        self.actuator.neutral_output();
    }
}

impl<A, H, C> DriveMgr<A, H, C>
where
    A: ActuatorPort,
    H: HeadingSource,
    C: Clock,
{
    /// Hand the drive to teleop control.
    ///
    /// The speed slew starts again from rest.
    pub fn enable_teleop(&mut self) {
        self.set_mode(DriveMode::Teleop);
    }

    /// Start following `trajectory` from the next cycle.
    ///
    /// Fails if a trajectory is already being followed, abort it first.
    pub fn follow_trajectory(&mut self, trajectory: Trajectory) -> Result<(), DriveMgrError> {
        if self.traj_ctrl.is_running() {
            return Err(TrajCtrlError::TrajectoryAlreadyRunning.into());
        }

        self.set_mode(DriveMode::Trajectory);
        self.traj_ctrl.begin(trajectory)?;

        Ok(())
    }

    /// Abort the trajectory being followed.
    ///
    /// The next cycle gives a zero demand and then disables the drive. Has no
    /// effect outside of trajectory mode.
    pub fn abort_trajectory(&mut self) {
        if self.mode == DriveMode::Trajectory {
            self.traj_ctrl.abort();
        }
    }

    /// Disable the drive, commanding the neutral output.
    pub fn disable(&mut self) {
        self.set_mode(DriveMode::Disabled);
    }

    /// Re-anchor the odometry at `pose` using the current sensor readings.
    pub fn reset_odometry(&mut self, pose: Pose2D) {
        let (left_m, right_m) = self.wheel_distances_m();
        let heading_deg = self.heading.get_heading_deg();
        self.odometry
            .reset_position(pose, heading_deg, left_m, right_m);
    }

    /// The latest pose estimate.
    pub fn pose(&self) -> Pose2D {
        self.odometry.pose()
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn traj_ctrl_mode(&self) -> TrajCtrlMode {
        self.traj_ctrl.mode()
    }

    pub fn params(&self) -> &DriveParams {
        &self.params
    }

    /// Stop whichever module was driving and switch mode, commanding the
    /// neutral output last.
    fn set_mode(&mut self, mode: DriveMode) {
        match self.mode {
            DriveMode::Disabled => (),
            DriveMode::Teleop => {
                self.teleop_ctrl.stop();
            }
            DriveMode::Trajectory => {
                self.traj_ctrl.stop();
            }
        }

        if mode == DriveMode::Teleop {
            self.teleop_ctrl.restart(self.clock.now_s());
        }

        if mode != self.mode {
            info!("DriveMgr mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;

        self.actuator.neutral_output();
    }

    /// Total distance travelled by each side.
    ///
    /// Units: meters
    fn wheel_distances_m(&self) -> (f64, f64) {
        let (left, right) = self.actuator.get_position();
        (self.conv.to_distance(left), self.conv.to_distance(right))
    }

    fn update_odometry(&mut self) -> Pose2D {
        let (left_m, right_m) = self.wheel_distances_m();
        let heading_deg = self.heading.get_heading_deg();
        self.odometry.update(heading_deg, left_m, right_m)
    }

    /// Run the module belonging to the current mode.
    fn mode_demand(
        &mut self,
        signal: &DriveSignal,
        time_s: f64,
        pose: Pose2D,
        report: &mut StatusReport,
    ) -> Result<DriveDemand, DriveMgrError> {
        match self.mode {
            DriveMode::Disabled => Ok(DriveDemand::Neutral),
            DriveMode::Teleop => {
                let (output, teleop_report) = self.teleop_ctrl.proc(&teleop_ctrl::InputData {
                    signal: *signal,
                    time_s,
                })?;
                report.teleop = Some(teleop_report);

                Ok(DriveDemand::OutputFraction {
                    left: output.left,
                    right: output.right,
                })
            }
            DriveMode::Trajectory => {
                let (left, right) = self.actuator.get_velocity();
                let measured_speeds =
                    self.conv
                        .wheel_speeds_from_sensor(left, right, self.params.velocity_period_s);

                let (output, traj_report) = self.traj_ctrl.proc(&traj_ctrl::InputData {
                    time_s,
                    pose,
                    measured_speeds,
                })?;
                report.traj = Some(traj_report);
                report.trajectory_finished = traj_report.finished;

                Ok(output.demand.unwrap_or(DriveDemand::Neutral))
            }
        }
    }
}
