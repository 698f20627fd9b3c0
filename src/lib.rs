//! fastslam - FastSLAM 1.0 in Rust
//!
//! Rao-Blackwellized particle filter estimating a robot pose and a set of
//! point landmarks from range/bearing observations with known data
//! association. The simulation harness and plotting utilities used by the
//! demo binary live next to the estimator but are not needed to run it.

// Core modules
pub mod common;
pub mod utils;

// Estimator
pub mod slam;

// Harness
pub mod simulation;

// Re-export common types for convenience
pub use common::{ControlInput, Observation, Point2D, Pose2D};
pub use common::{ControlSource, ObservationSource, StateEstimator};
pub use common::{SlamError, SlamResult};
pub use slam::{Execution, FastSlam, FastSlamConfig, Particle, ParticleSet};
