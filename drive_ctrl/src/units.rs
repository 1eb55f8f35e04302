//! # Unit conversions
//!
//! Conversions between the raw units reported by the wheel encoders and
//! physical units. The encoders report counts of the motor shaft, which is
//! geared down to the wheel by `gear_ratio`. Sensors which already report in
//! revolutions use a `counts_per_rev` of 1.
//!
//! Velocities reported by motor controllers are usually "counts per some
//! period" (100 ms for many smart controllers), so the velocity and RPM
//! conversions take that period explicitly.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// Internal
use crate::kinematics::WheelSpeeds;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of degrees in one revolution.
pub const DEGREES_PER_REV: f64 = 360.0;

/// Number of seconds in one minute.
const SECONDS_PER_MINUTE: f64 = 60.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical description of the drivetrain.
///
/// Constructed once at startup and shared read-only. All fields are strictly
/// positive, which is checked by [`DriveGeometry::new`] and
/// [`DriveGeometry::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveGeometry {
    /// Distance between the left and right wheel contact patches.
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// Diameter of the drive wheels.
    ///
    /// Units: meters
    pub wheel_diameter_m: f64,

    /// Motor shaft revolutions per wheel revolution.
    pub gear_ratio: f64,

    /// Encoder counts per revolution of the motor shaft.
    pub counts_per_rev: u32,
}

/// Converts between sensor units and physical units for a given geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    geometry: DriveGeometry,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised when building a geometry.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UnitsError {
    #[error("Drive geometry field `{0}` must be greater than zero, found {1}")]
    NonPositiveField(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveGeometry {
    /// Build a new geometry, checking that every field is positive.
    pub fn new(
        track_width_m: f64,
        wheel_diameter_m: f64,
        gear_ratio: f64,
        counts_per_rev: u32,
    ) -> Result<Self, UnitsError> {
        let geometry = Self {
            track_width_m,
            wheel_diameter_m,
            gear_ratio,
            counts_per_rev,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Check the geometry is usable, needed after deserialising one.
    pub fn validate(&self) -> Result<(), UnitsError> {
        // Written as !(x > 0) so that NaN is rejected too
        if !(self.track_width_m > 0.0) {
            return Err(UnitsError::NonPositiveField(
                "track_width_m",
                self.track_width_m,
            ));
        }
        if !(self.wheel_diameter_m > 0.0) {
            return Err(UnitsError::NonPositiveField(
                "wheel_diameter_m",
                self.wheel_diameter_m,
            ));
        }
        if !(self.gear_ratio > 0.0) {
            return Err(UnitsError::NonPositiveField("gear_ratio", self.gear_ratio));
        }
        if self.counts_per_rev == 0 {
            return Err(UnitsError::NonPositiveField("counts_per_rev", 0.0));
        }

        Ok(())
    }

    /// Distance travelled by the wheel in one revolution.
    ///
    /// Units: meters
    pub fn wheel_circumference_m(&self) -> f64 {
        PI * self.wheel_diameter_m
    }
}

impl UnitConverter {
    /// Create a converter for the given geometry.
    pub fn new(geometry: DriveGeometry) -> Self {
        Self { geometry }
    }

    /// The geometry this converter uses.
    pub fn geometry(&self) -> &DriveGeometry {
        &self.geometry
    }

    /// Counts per revolution of the wheel (motor counts times gearing).
    fn counts_per_wheel_rev(&self) -> f64 {
        self.geometry.counts_per_rev as f64 * self.geometry.gear_ratio
    }

    /// Convert a sensor position into the distance travelled by the wheel.
    pub fn to_distance(&self, sensor_units: f64) -> f64 {
        sensor_units / self.counts_per_wheel_rev() * self.geometry.wheel_circumference_m()
    }

    /// Convert a wheel distance into a sensor position.
    pub fn from_distance(&self, distance_m: f64) -> f64 {
        distance_m / self.geometry.wheel_circumference_m() * self.counts_per_wheel_rev()
    }

    /// Convert a sensor velocity, measured in counts per `period_s`, into a
    /// wheel velocity in meters/second.
    pub fn to_velocity(&self, sensor_units_per_period: f64, period_s: f64) -> f64 {
        self.to_distance(sensor_units_per_period) / period_s
    }

    /// Convert a wheel velocity in meters/second into counts per `period_s`.
    pub fn from_velocity(&self, velocity_ms: f64, period_s: f64) -> f64 {
        self.from_distance(velocity_ms) * period_s
    }

    /// Convert a sensor velocity, measured in counts per `period_s`, into
    /// wheel revolutions per minute.
    pub fn to_rpm(&self, sensor_units_per_period: f64, period_s: f64) -> f64 {
        sensor_units_per_period * SECONDS_PER_MINUTE / (self.counts_per_wheel_rev() * period_s)
    }

    /// Convert wheel revolutions per minute into counts per `period_s`.
    pub fn from_rpm(&self, rpm: f64, period_s: f64) -> f64 {
        rpm * (self.geometry.counts_per_rev as f64 / SECONDS_PER_MINUTE)
            * period_s
            * self.geometry.gear_ratio
    }

    /// Convert a sensor position into the angle turned by the wheel.
    ///
    /// Units: degrees
    pub fn to_angle_deg(&self, sensor_units: f64) -> f64 {
        sensor_units * (DEGREES_PER_REV / self.geometry.counts_per_rev as f64)
            / self.geometry.gear_ratio
    }

    /// Convert a wheel angle in degrees into a sensor position.
    pub fn from_angle_deg(&self, angle_deg: f64) -> f64 {
        angle_deg / (DEGREES_PER_REV / self.geometry.counts_per_rev as f64)
            * self.geometry.gear_ratio
    }

    /// Convert a pair of raw sensor velocities into wheel speeds.
    pub fn wheel_speeds_from_sensor(
        &self,
        left_sensor_units_per_period: f64,
        right_sensor_units_per_period: f64,
        period_s: f64,
    ) -> WheelSpeeds {
        WheelSpeeds::new(
            self.to_velocity(left_sensor_units_per_period, period_s),
            self.to_velocity(right_sensor_units_per_period, period_s),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-3;

    fn falcon_geometry() -> DriveGeometry {
        // 6 inch wheels, 10.71:1 gearbox and a 2048 count integrated encoder
        DriveGeometry::new(0.6223, 0.1524, 10.71, 2048).unwrap()
    }

    #[test]
    fn test_geometry_validation() {
        assert!(DriveGeometry::new(0.6, 0.15, 10.0, 2048).is_ok());
        assert_eq!(
            DriveGeometry::new(0.6, 0.0, 10.0, 2048),
            Err(UnitsError::NonPositiveField("wheel_diameter_m", 0.0))
        );
        assert_eq!(
            DriveGeometry::new(0.6, 0.15, -1.0, 2048),
            Err(UnitsError::NonPositiveField("gear_ratio", -1.0))
        );
        assert!(DriveGeometry::new(-0.6, 0.15, 10.0, 2048).is_err());
        assert!(DriveGeometry::new(0.6, 0.15, 10.0, 0).is_err());
        assert!(DriveGeometry::new(std::f64::NAN, 0.15, 10.0, 1).is_err());
    }

    #[test]
    fn test_to_distance_rotations() {
        // Sensor already reporting in rotations
        let conv = UnitConverter::new(DriveGeometry::new(1.0, 2.0, 1.0, 1).unwrap());
        assert_relative_eq!(conv.to_distance(3.0), 18.85, epsilon = EPSILON);

        let conv = UnitConverter::new(DriveGeometry::new(1.0, 2.0, 10.71, 1).unwrap());
        assert_relative_eq!(conv.to_distance(3.0), 1.76, epsilon = EPSILON);

        let conv = UnitConverter::new(DriveGeometry::new(1.0, 0.1524, 10.71, 1).unwrap());
        assert_relative_eq!(conv.to_distance(10.0), 0.447, epsilon = EPSILON);
    }

    #[test]
    fn test_from_distance_rotations() {
        let conv = UnitConverter::new(DriveGeometry::new(1.0, 2.0, 1.0, 1).unwrap());
        assert_relative_eq!(conv.from_distance(3.0), 0.477, epsilon = EPSILON);

        let conv = UnitConverter::new(DriveGeometry::new(1.0, 3.0, 12.75, 1).unwrap());
        assert_relative_eq!(conv.from_distance(2.4384), 3.298, epsilon = EPSILON);

        let conv = UnitConverter::new(DriveGeometry::new(1.0, 0.0762, 6.0, 1).unwrap());
        assert_relative_eq!(conv.from_distance(5.5), 137.85, epsilon = 0.01);
    }

    #[test]
    fn test_distance_round_trip() {
        let conv = UnitConverter::new(falcon_geometry());
        for s in &[0.0, 1.0, -2048.0, 123_456.7, -9.9e6] {
            assert_relative_eq!(
                conv.from_distance(conv.to_distance(*s)),
                *s,
                epsilon = 1e-6,
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_velocity() {
        let conv = UnitConverter::new(falcon_geometry());

        // One wheel revolution per 100 ms is ten per second
        let counts_per_wheel_rev = 2048.0 * 10.71;
        let v = conv.to_velocity(counts_per_wheel_rev, 0.1);
        assert_relative_eq!(v, 10.0 * PI * 0.1524, epsilon = 1e-9);
        assert_relative_eq!(conv.from_velocity(v, 0.1), counts_per_wheel_rev, epsilon = 1e-6);

        let speeds = conv.wheel_speeds_from_sensor(counts_per_wheel_rev, -counts_per_wheel_rev, 0.1);
        assert_relative_eq!(speeds.left_ms, v);
        assert_relative_eq!(speeds.right_ms, -v);
    }

    #[test]
    fn test_rpm() {
        let conv = UnitConverter::new(falcon_geometry());

        // One wheel revolution per 100 ms is 600 RPM
        let counts_per_wheel_rev = 2048.0 * 10.71;
        assert_relative_eq!(conv.to_rpm(counts_per_wheel_rev, 0.1), 600.0, epsilon = 1e-9);
        assert_relative_eq!(conv.from_rpm(600.0, 0.1), counts_per_wheel_rev, epsilon = 1e-6);
    }

    #[test]
    fn test_angle() {
        let conv = UnitConverter::new(DriveGeometry::new(1.0, 0.1, 2.0, 4096).unwrap());
        assert_relative_eq!(conv.to_angle_deg(4096.0), 180.0);
        assert_relative_eq!(conv.to_angle_deg(-1024.0), -45.0);
        assert_relative_eq!(conv.from_angle_deg(90.0), 2048.0);
    }
}
