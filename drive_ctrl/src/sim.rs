//! # Simulated chassis
//!
//! A simple kinematic model of a differential drive robot, standing in for
//! the real motor controllers and gyro during development and testing. The
//! chassis provides:
//!
//! - An [`ActuatorPort`] ([`SimActuator`]) which accepts every kind of demand
//!   and reports encoder positions and velocities in sensor units.
//! - A [`HeadingSource`] ([`SimHeading`]) reading zero at start up.
//! - A [`Clock`] ([`SimClock`]) which only advances when the chassis is
//!   stepped.
//!
//! Each side's speed follows its target with a first order lag. The handles
//! share the chassis state, so the control code can own them while the test
//! or harness keeps the [`SimChassis`] to step it and inspect the true pose.
//!
//! [`SimAxis`] is a single profiled mechanism in the same style, its
//! [`SimAxisHandle`] implementing [`MotionProfile`] and [`Neutral`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Deserialize;
use std::{cell::RefCell, rc::Rc};

// Internal
use crate::cmd::DriveDemand;
use crate::eqpt::{ActuatorPort, HeadingSource, MotionProfile, Neutral};
use crate::kinematics::{DiffDriveKinematics, WheelSpeeds};
use crate::loc::{Pose2D, Twist2D};
use crate::units::{DriveGeometry, UnitConverter};
use util::{maths::clamp, time::Clock};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated chassis.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SimParams {
    pub geometry: DriveGeometry,

    /// Period the encoder velocities are reported over.
    ///
    /// Units: seconds
    pub velocity_period_s: f64,

    /// Speed reached at full output fraction, and the fastest either side
    /// can go.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Voltage needed to overcome friction.
    ///
    /// Units: volts
    pub ks_v: f64,

    /// Voltage per unit of steady speed.
    ///
    /// Units: volts/(meters/second)
    pub kv_vspm: f64,

    /// Time constant of the wheel speed response, zero for an instant
    /// response.
    ///
    /// Units: seconds
    pub response_time_s: f64,
}

/// The simulated chassis.
pub struct SimChassis {
    state: Rc<RefCell<SimState>>,
}

/// Actuator handle on a [`SimChassis`].
pub struct SimActuator {
    state: Rc<RefCell<SimState>>,
}

/// Gyro handle on a [`SimChassis`].
pub struct SimHeading {
    state: Rc<RefCell<SimState>>,
}

/// Clock handle on a [`SimChassis`].
#[derive(Clone)]
pub struct SimClock {
    state: Rc<RefCell<SimState>>,
}

/// A simulated mechanism which profiles itself to a position target.
pub struct SimAxis {
    state: Rc<RefCell<AxisState>>,
}

/// Motor controller handle on a [`SimAxis`].
pub struct SimAxisHandle {
    state: Rc<RefCell<AxisState>>,
}

struct AxisState {
    position: f64,
    velocity: f64,

    /// Target being profiled to, `None` when in neutral
    target: Option<f64>,
    last_target: f64,

    cruise_velocity: f64,
    acceleration: f64,

    neutral_count: usize,
}

struct SimState {
    params: SimParams,
    conv: UnitConverter,
    kinematics: DiffDriveKinematics,

    /// Units: seconds
    time_s: f64,

    /// True pose in the field frame
    pose: Pose2D,

    /// Gyro reading minus the true heading
    ///
    /// Units: degrees
    heading_offset_deg: f64,

    /// Total distance travelled by each side
    ///
    /// Units: meters
    left_m: f64,
    right_m: f64,

    speeds: WheelSpeeds,
    target: WheelSpeeds,

    last_demand: DriveDemand,
    neutral_count: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            geometry: DriveGeometry {
                track_width_m: 0.6,
                wheel_diameter_m: 0.1524,
                gear_ratio: 10.71,
                counts_per_rev: 2048,
            },
            velocity_period_s: 0.1,
            max_speed_ms: 4.0,
            ks_v: 0.0,
            kv_vspm: 3.0,
            response_time_s: 0.0,
        }
    }
}

impl SimChassis {
    /// Create a stationary chassis at `initial_pose` with time zero.
    pub fn new(params: SimParams, initial_pose: Pose2D) -> Self {
        let state = SimState {
            conv: UnitConverter::new(params.geometry),
            kinematics: DiffDriveKinematics::new(params.geometry.track_width_m),
            params,
            time_s: 0.0,
            pose: initial_pose,
            heading_offset_deg: -initial_pose.heading_rad.to_degrees(),
            left_m: 0.0,
            right_m: 0.0,
            speeds: WheelSpeeds::default(),
            target: WheelSpeeds::default(),
            last_demand: DriveDemand::Neutral,
            neutral_count: 0,
        };

        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn actuator(&self) -> SimActuator {
        SimActuator {
            state: self.state.clone(),
        }
    }

    pub fn heading(&self) -> SimHeading {
        SimHeading {
            state: self.state.clone(),
        }
    }

    pub fn clock(&self) -> SimClock {
        SimClock {
            state: self.state.clone(),
        }
    }

    /// Advance the simulation by `dt_s` seconds.
    pub fn step(&self, dt_s: f64) {
        let mut s = self.state.borrow_mut();

        let alpha = if s.params.response_time_s > 0.0 {
            1.0 - (-dt_s / s.params.response_time_s).exp()
        } else {
            1.0
        };
        s.speeds = WheelSpeeds::new(
            s.speeds.left_ms + (s.target.left_ms - s.speeds.left_ms) * alpha,
            s.speeds.right_ms + (s.target.right_ms - s.speeds.right_ms) * alpha,
        );

        s.left_m += s.speeds.left_ms * dt_s;
        s.right_m += s.speeds.right_ms * dt_s;

        let chassis = s.kinematics.to_chassis_speeds(&s.speeds);
        s.pose = s.pose.exp(&Twist2D::new(
            chassis.linear_ms * dt_s,
            0.0,
            chassis.angular_rads * dt_s,
        ));
        s.time_s += dt_s;

        trace!(
            "Sim: t = {:.3} s, pose ({:.3}, {:.3}, {:.3} rad)",
            s.time_s,
            s.pose.position_m[0],
            s.pose.position_m[1],
            s.pose.heading_rad
        );
    }

    /// Units: seconds
    pub fn time_s(&self) -> f64 {
        self.state.borrow().time_s
    }

    /// The pose the chassis is actually at.
    pub fn true_pose(&self) -> Pose2D {
        self.state.borrow().pose
    }

    /// The current speed of each side.
    pub fn wheel_speeds(&self) -> WheelSpeeds {
        self.state.borrow().speeds
    }

    /// The most recent demand given to the actuator.
    pub fn last_demand(&self) -> DriveDemand {
        self.state.borrow().last_demand
    }

    /// Number of times the neutral output has been commanded.
    pub fn neutral_count(&self) -> usize {
        self.state.borrow().neutral_count
    }
}

impl SimState {
    fn set_target(&mut self, left_ms: f64, right_ms: f64, demand: DriveDemand) {
        let max = self.params.max_speed_ms;
        self.target = WheelSpeeds::new(clamp(left_ms, -max, max), clamp(right_ms, -max, max));
        self.last_demand = demand;
    }

    /// Steady speed reached with the given voltage.
    fn speed_from_voltage(&self, voltage_v: f64) -> f64 {
        let driving_v = (voltage_v.abs() - self.params.ks_v).max(0.0);
        voltage_v.signum() * driving_v / self.params.kv_vspm
    }
}

impl SimAxis {
    /// Create a stationary axis at `position`, in neutral and with no
    /// profile configured.
    pub fn new(position: f64) -> Self {
        let state = AxisState {
            position,
            velocity: 0.0,
            target: None,
            last_target: position,
            cruise_velocity: 0.0,
            acceleration: 0.0,
            neutral_count: 0,
        };

        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn handle(&self) -> SimAxisHandle {
        SimAxisHandle {
            state: self.state.clone(),
        }
    }

    /// Advance the axis by `dt_s` seconds.
    ///
    /// When profiling the axis accelerates up to the cruise velocity and
    /// slows so that it stops on the target without passing it. In neutral
    /// it holds still.
    pub fn step(&self, dt_s: f64) {
        let mut s = self.state.borrow_mut();

        let target = match s.target {
            Some(t) => t,
            None => {
                s.velocity = 0.0;
                return;
            }
        };

        let remaining = target - s.position;
        let desired = remaining.signum()
            * s.cruise_velocity
                .min((2.0 * s.acceleration * remaining.abs()).sqrt())
                .min(remaining.abs() / dt_s);

        // Speeding up is limited by the acceleration, the slowing down is
        // already part of the desired velocity
        if desired.abs() > s.velocity.abs() || desired * s.velocity < 0.0 {
            let max_dv = s.acceleration * dt_s;
            s.velocity += clamp(desired - s.velocity, -max_dv, max_dv);
        } else {
            s.velocity = desired;
        }

        s.position += s.velocity * dt_s;

        trace!(
            "Sim axis: position {:.3}, velocity {:.3}",
            s.position,
            s.velocity
        );
    }

    pub fn position(&self) -> f64 {
        self.state.borrow().position
    }

    pub fn velocity(&self) -> f64 {
        self.state.borrow().velocity
    }

    /// The configured cruise velocity and acceleration.
    pub fn profile(&self) -> (f64, f64) {
        let s = self.state.borrow();
        (s.cruise_velocity, s.acceleration)
    }

    /// True if the axis is in neutral.
    pub fn is_neutral(&self) -> bool {
        self.state.borrow().target.is_none()
    }

    /// Number of times the neutral output has been commanded.
    pub fn neutral_count(&self) -> usize {
        self.state.borrow().neutral_count
    }
}

impl MotionProfile for SimAxisHandle {
    fn config_motion_profile(&mut self, cruise_velocity: f64, acceleration: f64) {
        let mut s = self.state.borrow_mut();
        s.cruise_velocity = cruise_velocity;
        s.acceleration = acceleration;
    }

    fn set_position_target(&mut self, position: f64) {
        let mut s = self.state.borrow_mut();
        s.target = Some(position);
        s.last_target = position;
    }

    fn get_profile_position(&self) -> f64 {
        self.state.borrow().position
    }

    fn get_profile_target(&self) -> f64 {
        self.state.borrow().last_target
    }
}

impl Neutral for SimAxisHandle {
    fn neutral(&mut self) {
        let mut s = self.state.borrow_mut();
        s.target = None;
        s.velocity = 0.0;
        s.neutral_count += 1;
    }
}

impl ActuatorPort for SimActuator {
    fn set_velocity(&mut self, left: f64, right: f64) {
        let mut s = self.state.borrow_mut();
        let period_s = s.params.velocity_period_s;
        let left_ms = s.conv.to_velocity(left, period_s);
        let right_ms = s.conv.to_velocity(right, period_s);
        s.set_target(
            left_ms,
            right_ms,
            DriveDemand::Velocity(WheelSpeeds::new(left_ms, right_ms)),
        );
    }

    fn set_voltage(&mut self, left_v: f64, right_v: f64) {
        let mut s = self.state.borrow_mut();
        let left_ms = s.speed_from_voltage(left_v);
        let right_ms = s.speed_from_voltage(right_v);
        s.set_target(left_ms, right_ms, DriveDemand::Voltage { left_v, right_v });
    }

    fn set_output_fraction(&mut self, left: f64, right: f64) {
        let mut s = self.state.borrow_mut();
        let max = s.params.max_speed_ms;
        s.set_target(
            left * max,
            right * max,
            DriveDemand::OutputFraction { left, right },
        );
    }

    fn get_position(&self) -> (f64, f64) {
        let s = self.state.borrow();
        (s.conv.from_distance(s.left_m), s.conv.from_distance(s.right_m))
    }

    fn get_velocity(&self) -> (f64, f64) {
        let s = self.state.borrow();
        let period_s = s.params.velocity_period_s;
        (
            s.conv.from_velocity(s.speeds.left_ms, period_s),
            s.conv.from_velocity(s.speeds.right_ms, period_s),
        )
    }

    fn neutral_output(&mut self) {
        let mut s = self.state.borrow_mut();
        s.set_target(0.0, 0.0, DriveDemand::Neutral);
        s.neutral_count += 1;
    }
}

impl HeadingSource for SimHeading {
    fn get_heading_deg(&self) -> f64 {
        let s = self.state.borrow();
        s.pose.heading_rad.to_degrees() + s.heading_offset_deg
    }
}

impl Clock for SimClock {
    fn now_s(&self) -> f64 {
        self.state.borrow().time_s
    }
}
