//! Drive simulation harness
//!
//! Runs the drive core against a simulated chassis, for development of the
//! control modules without the robot.
//!
//! # Usage
//!
//! ```text
//! drive_sim [TRAJECTORY_JSON]
//! ```
//!
//! If a trajectory file is given it is followed, otherwise a generated
//! S-curve is used. After the trajectory a short scripted teleop sequence is
//! driven, then the drive is disabled.
//!
//! # Architecture
//!
//!     - Load parameters and initialise the DriveMgr on the simulated chassis
//!     - Main loop:
//!         - DriveMgr processing (odometry, then the active control module)
//!         - Step the simulation by one cycle period

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::f64::consts::PI;

// Internal
use drive_lib::{
    drive_mgr::{DriveMgr, DriveMode, DriveParams, InitData},
    loc::Pose2D,
    sim::{SimActuator, SimChassis, SimClock, SimHeading, SimParams},
    teleop_ctrl::{self, DriveSignal},
    traj_ctrl::{self, Trajectory, TrajectoryState},
};
use util::{
    logger::{logger_init, LoggerParams},
    module::{State, Stop},
    raise_error,
    session::Session,
    time::{Clock, MonotonicClock},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Longest the trajectory phase may take beyond the trajectory's own length.
const TRAJ_TIMEOUT_MARGIN_S: f64 = 5.0;

/// Scripted teleop sequence, pairs of duration and the driver's signal.
const TELEOP_SCRIPT: [(f64, DriveSignal); 4] = [
    (
        2.0,
        DriveSignal {
            speed: 0.8,
            turn: 0.0,
            trim: 0.0,
            slow: false,
        },
    ),
    (
        2.0,
        DriveSignal {
            speed: 0.6,
            turn: 0.5,
            trim: 0.0,
            slow: false,
        },
    ),
    (
        2.0,
        DriveSignal {
            speed: -0.5,
            turn: -0.5,
            trim: 0.1,
            slow: true,
        },
    ),
    (
        1.0,
        DriveSignal {
            speed: 0.0,
            turn: 0.0,
            trim: 0.0,
            slow: false,
        },
    ),
];

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_sim", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let logger_params: LoggerParams =
        util::params::load("logger.toml").wrap_err("Could not load logger params")?;
    logger_init(&logger_params, &session).wrap_err("Failed to initialise logging")?;

    info!("Drive Simulation\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let drive_params: DriveParams =
        util::params::load("drive.toml").wrap_err("Could not load drive params")?;
    let teleop_params: teleop_ctrl::Params =
        util::params::load("teleop_ctrl.toml").wrap_err("Could not load TeleopCtrl params")?;
    let traj_params: traj_ctrl::Params =
        util::params::load("traj_ctrl.toml").wrap_err("Could not load TrajCtrl params")?;
    let sim_params: SimParams =
        util::params::load("sim.toml").wrap_err("Could not load simulation params")?;

    info!("Parameters loaded");

    // ---- LOAD TRAJECTORY ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let trajectory = match args.len() {
        1 => {
            info!("No trajectory provided, using a generated S-curve");
            s_curve(drive_params.cycle_period_s)?
        }
        2 => {
            info!("Loading trajectory from \"{}\"", &args[1]);
            Trajectory::from_json_file(&args[1]).wrap_err("Failed to load the trajectory")?
        }
        n => {
            return Err(eyre!(
                "Expected either zero or one argument, found {}",
                n - 1
            ))
        }
    };

    info!(
        "Trajectory contains {} states and lasts {:.02} s\n",
        trajectory.states().len(),
        trajectory.total_time_s()
    );

    // ---- INITIALISE MODULES ----

    let start_pose = trajectory.first().pose;
    let chassis = SimChassis::new(sim_params, start_pose);

    let mut drive_mgr = DriveMgr::init(InitData {
        actuator: chassis.actuator(),
        heading: chassis.heading(),
        clock: chassis.clock(),
        params: drive_params,
        teleop_params,
        traj_params,
        initial_pose: start_pose,
    })
    .wrap_err("Failed to initialise DriveMgr")?;

    info!("Module initialisation complete\n");

    let wall_clock = MonotonicClock::new();

    // ---- TRAJECTORY PHASE ----

    let final_pose = trajectory.last().pose;
    let timeout_s = trajectory.total_time_s() + TRAJ_TIMEOUT_MARGIN_S;

    drive_mgr
        .follow_trajectory(trajectory)
        .wrap_err("Failed to start following the trajectory")?;

    let phase_start_s = chassis.time_s();
    let mut num_cycles: u64 = 0;

    while drive_mgr.mode() == DriveMode::Trajectory {
        if chassis.time_s() - phase_start_s > timeout_s {
            raise_error!("Trajectory did not finish within {:.02} s", timeout_s);
        }

        let (_, report) = drive_mgr
            .proc(&DriveSignal::default())
            .wrap_err("Error during trajectory following")?;

        // Status once a second
        if num_cycles % cycles_per_second(&drive_mgr) == 0 {
            debug!(
                "Status: {}",
                serde_json::to_string(&report).wrap_err("Failed to serialise the status report")?
            );
        }

        chassis.step(drive_mgr.params().cycle_period_s);
        num_cycles += 1;
    }

    let true_pose = chassis.true_pose();
    info!(
        "Trajectory complete after {} cycles, final position error {:.03} m, odometry error {:.03} m",
        num_cycles,
        final_pose.distance_to(&true_pose),
        drive_mgr.pose().distance_to(&true_pose)
    );

    // ---- TELEOP PHASE ----

    drive_mgr.enable_teleop();
    info!("Teleop enabled");

    for (duration_s, signal) in TELEOP_SCRIPT.iter() {
        info!("Driving {:?} for {:.01} s", signal, duration_s);

        let segment_end_s = chassis.time_s() + duration_s;
        while chassis.time_s() < segment_end_s {
            let (output, report) = drive_mgr
                .proc(signal)
                .wrap_err("Error during teleop")?;

            if let Some(teleop) = report.teleop {
                if teleop.normalised {
                    debug!("Outputs normalised: {:?}", output.demand);
                }
            }

            chassis.step(drive_mgr.params().cycle_period_s);
            num_cycles += 1;
        }
    }

    // ---- SHUTDOWN ----

    drive_mgr.stop();

    let speeds = chassis.wheel_speeds();
    if speeds.left_ms.abs() > 0.5 || speeds.right_ms.abs() > 0.5 {
        warn!("Chassis still moving at shutdown: {:?}", speeds);
    }

    let pose = drive_mgr.pose();
    info!(
        "Final pose estimate ({:.03}, {:.03}, {:.03} rad), truth ({:.03}, {:.03}, {:.03} rad)",
        pose.position_m[0],
        pose.position_m[1],
        pose.heading_rad,
        chassis.true_pose().position_m[0],
        chassis.true_pose().position_m[1],
        chassis.true_pose().heading_rad
    );
    info!(
        "Simulated {:.02} s ({} cycles) in {:.03} s",
        chassis.time_s(),
        num_cycles,
        wall_clock.now_s()
    );

    Ok(())
}

/// Number of cycles in one second, used for once per second logging.
fn cycles_per_second(drive_mgr: &DriveMgr<SimActuator, SimHeading, SimClock>) -> u64 {
    ((1.0 / drive_mgr.params().cycle_period_s).round() as u64).max(1)
}

/// A sideways S-curve along field +X, sampled every `period_s`.
fn s_curve(period_s: f64) -> Result<Trajectory, Report> {
    // Forward speed
    const SPEED_MS: f64 = 1.0;
    // Sideways amplitude
    const AMPLITUDE_M: f64 = 0.5;
    const DURATION_S: f64 = 6.0;

    let omega = 2.0 * PI / DURATION_S;
    let num_states = (DURATION_S / period_s).round() as usize;

    let states = (0..=num_states)
        .map(|i| {
            let t_s = i as f64 * DURATION_S / num_states as f64;

            let dx = SPEED_MS;
            let dy = AMPLITUDE_M * omega * (omega * t_s).cos();
            let ddy = -AMPLITUDE_M * omega * omega * (omega * t_s).sin();

            let speed_ms = dx.hypot(dy);
            let curvature_radpm = dx * ddy / speed_ms.powi(3);

            TrajectoryState {
                time_s: t_s,
                pose: Pose2D::new(SPEED_MS * t_s, AMPLITUDE_M * (omega * t_s).sin(), dy.atan2(dx)),
                velocity_ms: speed_ms,
                angular_velocity_rads: speed_ms * curvature_radpm,
                acceleration_mss: dy * ddy / speed_ms,
                curvature_radpm,
            }
        })
        .collect();

    Trajectory::new(states).wrap_err("Generated trajectory is invalid")
}
