//! Simulation history
//!
//! An append-only, time-ordered log of what the simulator did. Downstream
//! consumers (plotting, reporting) only ever read it.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::control::{ControlInput, DesiredState};
use crate::dynamics::State;

/// Which moment channel was clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MomentAxis {
    /// `moment1`, about the pitch axis
    Pitch,
    /// `moment2`, about the roll axis
    Roll,
}

/// A moment command that exceeded the actuator limits and was clipped.
///
/// Not an error; the step still ran with the clipped value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaturationEvent {
    pub axis: MomentAxis,
    pub commanded: f64,
    pub applied: f64,
}

/// One time point of the run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    /// Simulation time [s]
    pub time: f64,
    /// State at `time`, after the ground constraint
    pub state: State,
    /// Controller output that drove the step ending at `time`
    pub control: ControlInput,
    /// Pitch and roll moments actually integrated, after clamping
    pub applied_moments: [f64; 2],
    /// Clamps applied during this step
    pub saturation: Vec<SaturationEvent>,
    /// Whether the ground constraint corrected this state
    pub ground_contact: bool,
}

impl TrajectoryRecord {
    /// Record for the initial condition: no control has been applied yet.
    pub fn initial(state: State) -> Self {
        Self {
            time: 0.0,
            state,
            control: ControlInput::default(),
            applied_moments: [0.0, 0.0],
            saturation: Vec::new(),
            ground_contact: false,
        }
    }

    pub fn is_saturated(&self) -> bool {
        !self.saturation.is_empty()
    }
}

/// Time-ordered history of a run, starting with the initial condition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    records: Vec<TrajectoryRecord>,
}

impl Trajectory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    /// Appends a record. Records must arrive in time order.
    pub(crate) fn push(&mut self, record: TrajectoryRecord) {
        debug_assert!(self
            .records
            .last()
            .map_or(true, |last| last.time <= record.time));
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TrajectoryRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrajectoryRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&TrajectoryRecord> {
        self.records.last()
    }

    pub fn times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.time).collect()
    }

    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.records.iter().map(|r| r.state.position()).collect()
    }

    /// All clamps in time order, paired with the time of the step they occurred in.
    pub fn saturation_events(&self) -> Vec<(f64, SaturationEvent)> {
        self.records
            .iter()
            .flat_map(|r| r.saturation.iter().map(move |e| (r.time, *e)))
            .collect()
    }

    /// Lowest altitude reached, or `None` for an empty history.
    pub fn min_altitude(&self) -> Option<f64> {
        self.records.iter().map(|r| r.state.z).reduce(f64::min)
    }

    /// Euclidean distance between the last position and the target.
    pub fn final_position_error(&self, desired: &DesiredState) -> Option<f64> {
        self.last()
            .map(|r| (r.state.position() - desired.position()).norm())
    }

    /// Whether the run ended at the target.
    ///
    /// The mean of the signed per-axis position errors must lie strictly inside
    /// `(-tolerance, tolerance)`. Note that opposite errors on different axes cancel.
    pub fn settled(&self, desired: &DesiredState, tolerance: f64) -> bool {
        self.last().map_or(false, |r| {
            let mean = (r.state.position() - desired.position()).sum() / 3.0;
            mean > -tolerance && mean < tolerance
        })
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a TrajectoryRecord;
    type IntoIter = std::slice::Iter<'a, TrajectoryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
