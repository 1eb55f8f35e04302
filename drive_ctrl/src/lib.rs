//! # Drive library.
//!
//! Motion control core for a differential drive robot. Teleop input shaping,
//! odometry and trajectory tracking live here, the hardware itself is reached
//! only through the traits in [`eqpt`].
//!
//! # Architecture
//!
//! Each control cycle the owner of the drivetrain (normally [`drive_mgr`]):
//!
//! - Reads the wheel positions and heading
//! - Updates the odometry
//! - Runs exactly one of teleop control or trajectory control
//! - Writes the resulting demand to the actuators

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Demand types passed from the control modules to the actuators
pub mod cmd;

/// Drive manager - owns the drivetrain and arbitrates between drive modes
pub mod drive_mgr;

/// Pure functions used to shape teleop driver input
pub mod drive_util;

/// Equipment interfaces - the actuators and sensors this core talks to
pub mod eqpt;

/// Differential drive kinematics
pub mod kinematics;

/// Localisation module - pose types and wheel odometry
pub mod loc;

/// Profile control module - drives a profiled mechanism to a position
pub mod profile_ctrl;

/// Simulated chassis and mechanisms for development and testing
pub mod sim;

/// Slew rate limiting
pub mod slew;

/// Teleop control module - converts driver input into wheel output fractions
pub mod teleop_ctrl;

/// Trajectory control module - keeps the robot on the given trajectory
pub mod traj_ctrl;

/// Conversions between sensor units and physical units
pub mod units;
