//! Common traits defining the seams between the estimator and its environment

use crate::common::error::SlamResult;
use crate::common::types::*;

/// Trait for recursive state estimators (FastSLAM and friends)
pub trait StateEstimator {
    /// State type used by this estimator
    type State;
    /// Measurement type used by this estimator
    type Measurement;
    /// Control input type
    type Control;

    /// Prediction step
    fn predict(&mut self, control: &Self::Control, dt: f64) -> SlamResult<Self::State>;

    /// Update step with measurement
    fn update(&mut self, measurement: &Self::Measurement) -> SlamResult<Self::State>;

    /// Get current state estimate
    fn get_state(&self) -> &Self::State;
}

/// Supplies the control input applied over the next time step
pub trait ControlSource {
    fn control(&self) -> ControlInput;
}

/// Supplies the observation batch for the current time step.
///
/// Landmark ids must be stable across calls: data association is solved
/// upstream of the filter.
pub trait ObservationSource {
    fn observe(&mut self) -> Vec<Observation>;
}
