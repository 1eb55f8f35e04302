//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::*;
use crate::cmd::DriveDemand;
use crate::kinematics::{ChassisSpeeds, DiffDriveKinematics, WheelSpeeds};
use crate::loc::Pose2D;
use util::module::{State, Stop};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory control module state
pub struct TrajCtrl {
    params: Params,

    /// Executing mode
    mode: TrajCtrlMode,

    /// The trajectory being followed
    trajectory: Option<Trajectory>,

    /// Time the current trajectory started, captured on the first running
    /// cycle.
    ///
    /// Units: seconds
    start_time_s: Option<f64>,

    /// Control law used to calculate the chassis speeds
    controller: Box<dyn TrackingController>,

    kinematics: DiffDriveKinematics,

    /// Voltage mode per-side controllers
    left_pid: PidController,
    right_pid: PidController,

    /// Previous wheel set-point and its time, used for the feedforward
    /// acceleration term
    prev_setpoint: Option<(WheelSpeeds, f64)>,
}

/// Data needed to initialise TrajCtrl.
pub struct InitData {
    pub params: Params,

    /// Units: meters
    pub track_width_m: f64,
}

/// Input data to the module
#[derive(Debug, Default, Copy, Clone)]
pub struct InputData {
    /// Current time from the control loop's clock.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Current pose estimate, updated earlier in the same cycle.
    pub pose: Pose2D,

    /// Measured wheel speeds, only used in voltage mode.
    pub measured_speeds: WheelSpeeds,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize)]
pub struct OutputData {
    /// The demand to execute, or `None` if TrajCtrl is idle.
    pub demand: Option<DriveDemand>,
}

/// The status report containing various error flags and monitoring quantities.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Time since the start of the trajectory.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// Reference state followed this cycle.
    pub reference: Option<TrajectoryState>,

    /// Pose error in the robot frame, reference relative to the robot.
    pub pose_error: Option<Pose2D>,

    /// Chassis speeds output by the control law.
    pub chassis_speeds: Option<ChassisSpeeds>,

    /// If true the wheel speed demand was scaled down to the limit.
    pub wheel_speed_limited: bool,

    /// If true the trajectory finished (or was aborted) this cycle.
    pub finished: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of execution of TrajCtrl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrajCtrlMode {
    /// No trajectory loaded, no demands produced.
    Idle,

    /// Following a trajectory.
    Running,

    /// The trajectory completed or was aborted, the next cycle emits a zero
    /// demand and returns to idle.
    Finished,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TrajCtrl {
    type InitData = InitData;
    type InitError = TrajCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    /// Initialise the TrajCtrl module with the control law given in the
    /// parameters.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        let controller: Box<dyn TrackingController> = match init_data.params.controller {
            ControllerParams::Ramsete { b, zeta } => Box::new(RamseteController::new(b, zeta)),
            ControllerParams::Ltv(ref ltv) => Box::new(LtvUnicycleController::new(ltv)?),
            ControllerParams::FeedForward => Box::new(FeedForwardController),
        };

        Self::with_controller(init_data.params, init_data.track_width_m, controller)
    }

    /// Process trajectory control.
    ///
    /// Processing involves:
    ///  1. Capturing the start time on the first running cycle
    ///  1. Sampling the trajectory at the elapsed time
    ///  1. Running the control law and converting to wheel demands
    ///  1. Finishing once the trajectory's time has passed
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut report = StatusReport::default();

        let demand = match self.mode {
            TrajCtrlMode::Idle => None,
            TrajCtrlMode::Running => self.mode_running(input_data, &mut report),
            TrajCtrlMode::Finished => Some(self.mode_finished(&mut report)),
        };

        Ok((OutputData { demand }, report))
    }
}

impl Stop for TrajCtrl {
    /// Drop any trajectory and return to idle, giving the zero demand.
    fn stop(&mut self) -> Self::OutputData {
        if self.mode != TrajCtrlMode::Idle {
            info!("TrajCtrl stopped");
        }
        self.clear();
        OutputData {
            demand: Some(self.zero_demand()),
        }
    }
}

impl TrajCtrl {
    /// Create TrajCtrl with a caller provided control law.
    ///
    /// The parameters are still validated, including the RAMSETE gains if
    /// they are selected.
    pub fn with_controller(
        params: Params,
        track_width_m: f64,
        controller: Box<dyn TrackingController>,
    ) -> Result<Self, TrajCtrlError> {
        if !(track_width_m > 0.0) {
            return Err(TrajCtrlError::InvalidTrackWidth(track_width_m));
        }
        params.validate()?;

        Ok(Self {
            left_pid: PidController::from_gains(&params.wheel_pid),
            right_pid: PidController::from_gains(&params.wheel_pid),
            params,
            mode: TrajCtrlMode::Idle,
            trajectory: None,
            start_time_s: None,
            controller,
            kinematics: DiffDriveKinematics::new(track_width_m),
            prev_setpoint: None,
        })
    }

    /// Begin following a trajectory.
    ///
    /// Following starts on the next call to `proc`, whose time becomes the
    /// start time of the trajectory. Starting a new trajectory while one is
    /// still running is an error, call `abort` first.
    pub fn begin(&mut self, trajectory: Trajectory) -> Result<(), TrajCtrlError> {
        if self.mode == TrajCtrlMode::Running {
            return Err(TrajCtrlError::TrajectoryAlreadyRunning);
        }

        info!(
            "Beginning trajectory of {} states lasting {:.2} s",
            trajectory.states().len(),
            trajectory.total_time_s()
        );

        self.clear();
        self.trajectory = Some(trajectory);
        self.mode = TrajCtrlMode::Running;

        Ok(())
    }

    /// Abort the current trajectory.
    ///
    /// The next call to `proc` gives a zero demand.
    pub fn abort(&mut self) {
        if self.mode == TrajCtrlMode::Running {
            warn!("Trajectory aborted");
            self.mode = TrajCtrlMode::Finished;
        }
    }

    /// The current mode.
    pub fn mode(&self) -> TrajCtrlMode {
        self.mode
    }

    /// True while a trajectory is being followed.
    pub fn is_running(&self) -> bool {
        self.mode == TrajCtrlMode::Running
    }

    /// The zero demand in the current output mode.
    pub fn zero_demand(&self) -> DriveDemand {
        match self.params.output_mode {
            OutputMode::Velocity => DriveDemand::zero_velocity(),
            OutputMode::Voltage => DriveDemand::Voltage {
                left_v: 0.0,
                right_v: 0.0,
            },
        }
    }

    /// Forget the trajectory and every piece of history.
    fn clear(&mut self) {
        self.mode = TrajCtrlMode::Idle;
        self.trajectory = None;
        self.start_time_s = None;
        self.prev_setpoint = None;
        self.left_pid.reset();
        self.right_pid.reset();
    }

    fn mode_running(
        &mut self,
        input_data: &InputData,
        report: &mut StatusReport,
    ) -> Option<DriveDemand> {
        let start_time_s = *self.start_time_s.get_or_insert(input_data.time_s);
        let elapsed_s = input_data.time_s - start_time_s;
        report.elapsed_s = elapsed_s;

        let sample = self
            .trajectory
            .as_ref()
            .filter(|t| elapsed_s < t.total_time_s())
            .map(|t| t.sample(elapsed_s));

        let reference = match sample {
            Some(r) => r,
            None => {
                debug!("Trajectory complete after {:.2} s", elapsed_s);
                self.mode = TrajCtrlMode::Finished;
                return Some(self.mode_finished(report));
            }
        };

        let chassis = self.controller.calculate(&input_data.pose, &reference);

        let raw_speeds = self.kinematics.to_wheel_speeds(&chassis);
        let speeds = raw_speeds.desaturate(self.params.max_wheel_speed_ms);

        report.reference = Some(reference);
        report.pose_error = Some(reference.pose.relative_to(&input_data.pose));
        report.chassis_speeds = Some(chassis);
        report.wheel_speed_limited = speeds != raw_speeds;

        let demand = match self.params.output_mode {
            OutputMode::Velocity => DriveDemand::Velocity(speeds),
            OutputMode::Voltage => {
                self.voltage_demand(speeds, input_data.measured_speeds, input_data.time_s)
            }
        };

        Some(demand)
    }

    /// Emit the zero demand once and go back to idle.
    fn mode_finished(&mut self, report: &mut StatusReport) -> DriveDemand {
        report.finished = true;
        self.clear();
        self.zero_demand()
    }

    /// Feedforward on the set-point plus PID on the measured speed error.
    fn voltage_demand(
        &mut self,
        setpoint: WheelSpeeds,
        measured: WheelSpeeds,
        now_s: f64,
    ) -> DriveDemand {
        let (left_accel_mss, right_accel_mss) = match self.prev_setpoint {
            Some((prev, prev_time_s)) if now_s > prev_time_s => {
                let dt_s = now_s - prev_time_s;
                (
                    (setpoint.left_ms - prev.left_ms) / dt_s,
                    (setpoint.right_ms - prev.right_ms) / dt_s,
                )
            }
            _ => (0.0, 0.0),
        };
        self.prev_setpoint = Some((setpoint, now_s));

        let ff = self.params.feedforward;

        DriveDemand::Voltage {
            left_v: ff.calculate(setpoint.left_ms, left_accel_mss)
                + self.left_pid.get(setpoint.left_ms - measured.left_ms, now_s),
            right_v: ff.calculate(setpoint.right_ms, right_accel_mss)
                + self.right_pid.get(setpoint.right_ms - measured.right_ms, now_s),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::loc::Twist2D;
    use approx::assert_relative_eq;

    const TRACK_WIDTH_M: f64 = 0.6;
    const DT_S: f64 = 0.02;

    /// Straight line along field +X at constant speed.
    fn straight(length_s: f64, v_ms: f64) -> Trajectory {
        let n = (length_s / 0.1).round() as usize;
        Trajectory::new(
            (0..=n)
                .map(|i| {
                    let t_s = i as f64 * 0.1;
                    TrajectoryState {
                        time_s: t_s,
                        pose: Pose2D::new(v_ms * t_s, 0.0, 0.0),
                        velocity_ms: v_ms,
                        ..Default::default()
                    }
                })
                .collect(),
        )
        .unwrap()
    }

    /// Stationary target at the given pose.
    fn stationary(pose: Pose2D) -> Trajectory {
        Trajectory::new(vec![
            TrajectoryState {
                time_s: 0.0,
                pose,
                ..Default::default()
            },
            TrajectoryState {
                time_s: 1.0,
                pose,
                ..Default::default()
            },
        ])
        .unwrap()
    }

    fn traj_ctrl(controller: ControllerParams) -> TrajCtrl {
        TrajCtrl::init(InitData {
            params: Params {
                controller,
                ..Default::default()
            },
            track_width_m: TRACK_WIDTH_M,
        })
        .unwrap()
    }

    fn input(time_s: f64, pose: Pose2D) -> InputData {
        InputData {
            time_s,
            pose,
            ..Default::default()
        }
    }

    #[test]
    fn test_stationary_target_is_passthrough() {
        let mut tc = traj_ctrl(ControllerParams::Ramsete { b: 2.0, zeta: 0.7 });
        let pose = Pose2D::new(0.5, -0.25, 1.0);
        tc.begin(stationary(pose)).unwrap();

        for i in 0..10 {
            let (out, report) = tc.proc(&input(3.0 + i as f64 * DT_S, pose)).unwrap();
            assert_eq!(out.demand, Some(DriveDemand::Velocity(WheelSpeeds::new(0.0, 0.0))));
            assert_eq!(report.chassis_speeds, Some(ChassisSpeeds::new(0.0, 0.0)));
            assert!(!report.finished);
        }
    }

    #[test]
    fn test_abort_gives_zero_next_cycle() {
        let mut tc = traj_ctrl(ControllerParams::Ramsete { b: 2.0, zeta: 0.7 });
        tc.begin(straight(5.0, 1.0)).unwrap();

        let (out, _) = tc.proc(&input(0.0, Pose2D::default())).unwrap();
        assert!(!out.demand.unwrap().is_zero());
        let (out, _) = tc.proc(&input(0.5, Pose2D::new(0.5, 0.0, 0.0))).unwrap();
        assert!(!out.demand.unwrap().is_zero());

        tc.abort();
        assert_eq!(tc.mode(), TrajCtrlMode::Finished);

        let (out, report) = tc.proc(&input(0.52, Pose2D::new(0.52, 0.0, 0.0))).unwrap();
        assert!(report.finished);
        assert_eq!(out.demand, Some(DriveDemand::zero_velocity()));
        assert_eq!(tc.mode(), TrajCtrlMode::Idle);

        // Idle produces nothing
        let (out, _) = tc.proc(&input(0.54, Pose2D::new(0.52, 0.0, 0.0))).unwrap();
        assert_eq!(out.demand, None);

        // Aborting while idle does nothing
        tc.abort();
        assert_eq!(tc.mode(), TrajCtrlMode::Idle);
    }

    #[test]
    fn test_finishes_after_total_time() {
        let mut tc = traj_ctrl(ControllerParams::FeedForward);
        tc.begin(straight(1.0, 1.0)).unwrap();

        // Start time is taken from the first cycle, not from begin
        let (out, report) = tc.proc(&input(10.0, Pose2D::default())).unwrap();
        assert_relative_eq!(report.elapsed_s, 0.0);
        assert_eq!(out.demand, Some(DriveDemand::Velocity(WheelSpeeds::new(1.0, 1.0))));

        let (_, report) = tc.proc(&input(10.98, Pose2D::default())).unwrap();
        assert!(!report.finished);

        let (out, report) = tc.proc(&input(11.0, Pose2D::default())).unwrap();
        assert!(report.finished);
        assert_eq!(out.demand, Some(DriveDemand::zero_velocity()));
        assert_eq!(tc.mode(), TrajCtrlMode::Idle);

        // A new trajectory can now be started
        assert!(tc.begin(straight(1.0, 1.0)).is_ok());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let init = |params| {
            TrajCtrl::init(InitData {
                params,
                track_width_m: TRACK_WIDTH_M,
            })
        };

        // A negative convergence gain would make the RAMSETE gain NaN
        let result = init(Params {
            controller: ControllerParams::Ramsete { b: -2.0, zeta: 0.7 },
            ..Default::default()
        });
        assert!(matches!(result, Err(TrajCtrlError::InvalidRamseteParams(_, _))));

        // A negative limit would flip the sign of both wheels
        let result = init(Params {
            max_wheel_speed_ms: -0.5,
            ..Default::default()
        });
        assert!(matches!(result, Err(TrajCtrlError::InvalidMaxWheelSpeed(_))));

        let result = TrajCtrl::with_controller(
            Params {
                max_wheel_speed_ms: f64::NAN,
                ..Default::default()
            },
            TRACK_WIDTH_M,
            Box::new(FeedForwardController),
        );
        assert!(matches!(result, Err(TrajCtrlError::InvalidMaxWheelSpeed(_))));

        let result = init(Params::default());
        assert!(result.is_ok());
    }

    #[test]
    fn test_begin_while_running() {
        let mut tc = traj_ctrl(ControllerParams::FeedForward);
        tc.begin(straight(1.0, 1.0)).unwrap();
        assert!(matches!(
            tc.begin(straight(1.0, 1.0)),
            Err(TrajCtrlError::TrajectoryAlreadyRunning)
        ));
    }

    #[test]
    fn test_stop() {
        let mut tc = traj_ctrl(ControllerParams::FeedForward);
        tc.begin(straight(1.0, 1.0)).unwrap();
        tc.proc(&input(0.0, Pose2D::default())).unwrap();

        let out = tc.stop();
        assert_eq!(out.demand, Some(DriveDemand::zero_velocity()));
        assert_eq!(tc.mode(), TrajCtrlMode::Idle);

        // Idempotent
        assert_eq!(tc.stop(), out);
        assert_eq!(tc.mode(), TrajCtrlMode::Idle);
    }

    #[test]
    fn test_wheel_speed_limit() {
        let mut tc = traj_ctrl(ControllerParams::FeedForward);
        tc.begin(straight(2.0, 5.0)).unwrap();

        let (out, report) = tc.proc(&input(0.0, Pose2D::default())).unwrap();
        assert!(report.wheel_speed_limited);
        assert_eq!(out.demand, Some(DriveDemand::Velocity(WheelSpeeds::new(3.0, 3.0))));
    }

    #[test]
    fn test_voltage_mode() {
        let mut tc = TrajCtrl::init(InitData {
            params: Params {
                controller: ControllerParams::FeedForward,
                output_mode: OutputMode::Voltage,
                feedforward: SimpleMotorFeedforward::new(0.5, 2.0, 0.0),
                wheel_pid: PidGains {
                    k_p: 1.0,
                    k_i: 0.0,
                    k_d: 0.0,
                },
                ..Default::default()
            },
            track_width_m: TRACK_WIDTH_M,
        })
        .unwrap();
        tc.begin(straight(2.0, 1.0)).unwrap();

        // Measured left slower than the set-point, right on it
        let (out, _) = tc
            .proc(&InputData {
                time_s: 0.0,
                pose: Pose2D::default(),
                measured_speeds: WheelSpeeds::new(0.75, 1.0),
            })
            .unwrap();

        match out.demand {
            Some(DriveDemand::Voltage { left_v, right_v }) => {
                assert_relative_eq!(left_v, 2.75);
                assert_relative_eq!(right_v, 2.5);
            }
            other => panic!("Expected a voltage demand, got {:?}", other),
        }

        tc.abort();
        let (out, _) = tc.proc(&input(0.02, Pose2D::default())).unwrap();
        assert_eq!(
            out.demand,
            Some(DriveDemand::Voltage {
                left_v: 0.0,
                right_v: 0.0
            })
        );
    }

    /// Run a closed loop simulation of a perfect unicycle following a
    /// straight line from a perturbed start, returning the final error.
    fn converge(controller: ControllerParams) -> Pose2D {
        let mut tc = traj_ctrl(controller);
        let traj = straight(10.0, 1.0);
        tc.begin(traj.clone()).unwrap();

        let mut pose = Pose2D::new(-0.1, 0.4, -0.3);
        let kin = DiffDriveKinematics::new(TRACK_WIDTH_M);

        for i in 0..400 {
            let t_s = i as f64 * DT_S;
            let (out, _) = tc.proc(&input(t_s, pose)).unwrap();

            let speeds = match out.demand {
                Some(DriveDemand::Velocity(s)) => s,
                other => panic!("Expected a velocity demand, got {:?}", other),
            };
            let chassis = kin.to_chassis_speeds(&speeds);
            pose = pose.exp(&Twist2D::new(
                chassis.linear_ms * DT_S,
                0.0,
                chassis.angular_rads * DT_S,
            ));
        }

        traj.sample(400.0 * DT_S).pose.relative_to(&pose)
    }

    #[test]
    fn test_ramsete_converges() {
        let error = converge(ControllerParams::Ramsete { b: 2.0, zeta: 0.7 });
        assert!(error.position_m.norm() < 0.05);
        assert!(error.heading_rad.abs() < 0.05);
    }

    #[test]
    fn test_ltv_converges() {
        let error = converge(ControllerParams::Ltv(LtvParams::default()));
        assert!(error.position_m.norm() < 0.05);
        assert!(error.heading_rad.abs() < 0.05);
    }
}
