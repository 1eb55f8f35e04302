//! # Equipment interfaces
//!
//! The control core never talks to motor controllers or the gyro directly.
//! Instead the owner of the drivetrain provides implementations of
//! [`ActuatorPort`] and [`HeadingSource`].
//!
//! The narrow capability traits ([`Tank`], [`VelocityDrive`],
//! [`VoltageDrive`] and [`Neutral`]) are implemented for every actuator port,
//! so code that only needs one capability can ask for just that.
//!
//! Mechanisms whose motor controller runs its own position profile implement
//! [`MotionProfile`] together with [`Neutral`].

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The pair of drive motor controllers.
///
/// Positions and velocities are raw sensor units, velocities being measured
/// per the controller's velocity period. All calls must be non-blocking.
pub trait ActuatorPort {
    /// Closed loop velocity demand.
    ///
    /// Units: sensor units per velocity period
    fn set_velocity(&mut self, left: f64, right: f64);

    /// Units: volts
    fn set_voltage(&mut self, left_v: f64, right_v: f64);

    /// Open loop demand as a fraction of full output, between -1 and +1.
    fn set_output_fraction(&mut self, left: f64, right: f64);

    /// Accumulated sensor position of each side.
    ///
    /// Units: sensor units
    fn get_position(&self) -> (f64, f64);

    /// Measured velocity of each side.
    ///
    /// Units: sensor units per velocity period
    fn get_velocity(&self) -> (f64, f64);

    /// Stop driving and apply the controllers' neutral mode.
    fn neutral_output(&mut self);
}

/// The absolute heading sensor.
pub trait HeadingSource {
    /// Heading of the chassis, counter-clockwise positive.
    ///
    /// Units: degrees
    fn get_heading_deg(&self) -> f64;
}

/// Open loop left/right driving.
pub trait Tank {
    fn tank(&mut self, left: f64, right: f64);
}

/// Closed loop velocity driving, in sensor units per velocity period.
pub trait VelocityDrive {
    fn velocity(&mut self, left: f64, right: f64);
}

/// Voltage driving.
pub trait VoltageDrive {
    fn voltage(&mut self, left_v: f64, right_v: f64);
}

/// Anything which can be made safe.
pub trait Neutral {
    fn neutral(&mut self);
}

/// A mechanism whose motor controller profiles its own way to a position
/// target, limited by a cruise velocity and an acceleration.
///
/// Units are the mechanism's own, position units, position units per second
/// and position units per second squared.
pub trait MotionProfile {
    /// Set the limits used by the next position target.
    fn config_motion_profile(&mut self, cruise_velocity: f64, acceleration: f64);

    /// Start profiling to `position`.
    fn set_position_target(&mut self, position: f64);

    /// Measured position.
    fn get_profile_position(&self) -> f64;

    /// The target the controller is profiling to.
    fn get_profile_target(&self) -> f64;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<A: ActuatorPort> Tank for A {
    fn tank(&mut self, left: f64, right: f64) {
        self.set_output_fraction(left, right)
    }
}

impl<A: ActuatorPort> VelocityDrive for A {
    fn velocity(&mut self, left: f64, right: f64) {
        self.set_velocity(left, right)
    }
}

impl<A: ActuatorPort> VoltageDrive for A {
    fn voltage(&mut self, left_v: f64, right_v: f64) {
        self.set_voltage(left_v, right_v)
    }
}

impl<A: ActuatorPort> Neutral for A {
    fn neutral(&mut self) {
        self.neutral_output()
    }
}

impl<H: HeadingSource + ?Sized> HeadingSource for &H {
    fn get_heading_deg(&self) -> f64 {
        (**self).get_heading_deg()
    }
}

impl<A: ActuatorPort + ?Sized> ActuatorPort for Box<A> {
    fn set_velocity(&mut self, left: f64, right: f64) {
        (**self).set_velocity(left, right)
    }

    fn set_voltage(&mut self, left_v: f64, right_v: f64) {
        (**self).set_voltage(left_v, right_v)
    }

    fn set_output_fraction(&mut self, left: f64, right: f64) {
        (**self).set_output_fraction(left, right)
    }

    fn get_position(&self) -> (f64, f64) {
        (**self).get_position()
    }

    fn get_velocity(&self) -> (f64, f64) {
        (**self).get_velocity()
    }

    fn neutral_output(&mut self) {
        (**self).neutral_output()
    }
}
