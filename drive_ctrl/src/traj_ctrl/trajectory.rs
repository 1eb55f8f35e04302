//! # Trajectories
//!
//! A trajectory is produced by an external planner as a list of states, each
//! giving where the robot should be and how it should be moving at a given
//! time. Once built a trajectory is never modified, re-anchoring it produces
//! a new trajectory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Internal
use super::TrajectoryError;
use crate::loc::Pose2D;
use util::maths::lerp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The reference state of the robot at a point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryState {
    /// Time since the start of the trajectory.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Reference pose in the field frame.
    pub pose: Pose2D,

    /// Units: meters/second
    pub velocity_ms: f64,

    /// Units: radians/second
    pub angular_velocity_rads: f64,

    /// Units: meters/second^2
    pub acceleration_mss: f64,

    /// Units: radians/meter
    pub curvature_radpm: f64,
}

/// An immutable, time ordered sequence of trajectory states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    states: Vec<TrajectoryState>,
}

/// Trajectory state as written by planners, where the angular velocity may
/// be left out and derived from the curvature.
#[derive(Deserialize)]
struct StateRecord {
    time_s: f64,
    pose: Pose2D,
    velocity_ms: f64,
    #[serde(default)]
    angular_velocity_rads: Option<f64>,
    #[serde(default)]
    acceleration_mss: f64,
    #[serde(default)]
    curvature_radpm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajectoryState {
    /// Interpolate between this state and `end`, which must come later.
    ///
    /// `t` is the fraction of the time between the two states.
    pub fn interpolate(&self, end: &TrajectoryState, t: f64) -> TrajectoryState {
        TrajectoryState {
            time_s: lerp(self.time_s, end.time_s, t),
            pose: self.pose.interpolate(&end.pose, t),
            velocity_ms: lerp(self.velocity_ms, end.velocity_ms, t),
            angular_velocity_rads: lerp(self.angular_velocity_rads, end.angular_velocity_rads, t),
            acceleration_mss: lerp(self.acceleration_mss, end.acceleration_mss, t),
            curvature_radpm: lerp(self.curvature_radpm, end.curvature_radpm, t),
        }
    }
}

impl From<StateRecord> for TrajectoryState {
    fn from(rec: StateRecord) -> Self {
        TrajectoryState {
            time_s: rec.time_s,
            pose: rec.pose,
            velocity_ms: rec.velocity_ms,
            angular_velocity_rads: rec
                .angular_velocity_rads
                .unwrap_or(rec.velocity_ms * rec.curvature_radpm),
            acceleration_mss: rec.acceleration_mss,
            curvature_radpm: rec.curvature_radpm,
        }
    }
}

impl Trajectory {
    /// Build a trajectory from a list of states.
    ///
    /// The list must be non-empty, every time must be finite and times must
    /// be strictly increasing. A first time other than zero is accepted with a
    /// warning.
    pub fn new(states: Vec<TrajectoryState>) -> Result<Self, TrajectoryError> {
        if states.is_empty() {
            return Err(TrajectoryError::Empty);
        }

        for (i, s) in states.iter().enumerate() {
            if !s.time_s.is_finite() {
                return Err(TrajectoryError::NonFiniteTime(i));
            }
        }

        for (i, pair) in states.windows(2).enumerate() {
            if pair[1].time_s <= pair[0].time_s {
                return Err(TrajectoryError::NotTimeIncreasing(i + 1));
            }
        }

        if states[0].time_s != 0.0 {
            warn!(
                "Trajectory starts at {} s rather than 0 s, sampling will hold the first state until then",
                states[0].time_s
            );
        }

        Ok(Self { states })
    }

    /// Parse a trajectory from a JSON list of states.
    pub fn from_json(json: &str) -> Result<Self, TrajectoryError> {
        let records: Vec<StateRecord> = serde_json::from_str(json)?;
        Self::new(records.into_iter().map(TrajectoryState::from).collect())
    }

    /// Load a trajectory from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TrajectoryError> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TrajectoryError::FileLoadError(path.as_ref().to_path_buf(), e))?;
        Self::from_json(&json)
    }

    /// The states making up this trajectory.
    pub fn states(&self) -> &[TrajectoryState] {
        &self.states
    }

    /// Time of the last state.
    ///
    /// Units: seconds
    pub fn total_time_s(&self) -> f64 {
        self.last().time_s
    }

    /// The first state.
    pub fn first(&self) -> &TrajectoryState {
        // Never empty, checked on construction
        &self.states[0]
    }

    /// The last state.
    pub fn last(&self) -> &TrajectoryState {
        &self.states[self.states.len() - 1]
    }

    /// Sample the trajectory at `time_s`.
    ///
    /// Times before the first state give the first state and times after the
    /// last state give the last state.
    pub fn sample(&self, time_s: f64) -> TrajectoryState {
        let first = self.first();
        let last = self.last();

        // NaN times also give the first state
        if !(time_s > first.time_s) {
            return *first;
        }
        if time_s >= last.time_s {
            return *last;
        }

        // Index of the first state after time_s, which is at least 1 and at
        // most len - 1 given the checks above
        let upper = match self
            .states
            .binary_search_by(|s| s.time_s.partial_cmp(&time_s).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => return self.states[i],
            Err(i) => i,
        };

        let start = &self.states[upper - 1];
        let end = &self.states[upper];

        start.interpolate(end, (time_s - start.time_s) / (end.time_s - start.time_s))
    }

    /// Express every state's pose relative to `origin`.
    ///
    /// Used to make a trajectory planned in the field frame start from the
    /// robot's own frame.
    pub fn relative_to(&self, origin: &Pose2D) -> Trajectory {
        Trajectory {
            states: self
                .states
                .iter()
                .map(|s| TrajectoryState {
                    pose: s.pose.relative_to(origin),
                    ..*s
                })
                .collect(),
        }
    }

    /// Move the whole trajectory so that its first pose is moved by
    /// `transform`, keeping the shape of the path.
    pub fn transform_by(&self, transform: &Pose2D) -> Trajectory {
        let first_pose = self.first().pose;
        let new_first_pose = first_pose.transform_by(transform);

        Trajectory {
            states: self
                .states
                .iter()
                .map(|s| TrajectoryState {
                    pose: new_first_pose.transform_by(&s.pose.relative_to(&first_pose)),
                    ..*s
                })
                .collect(),
        }
    }
}
