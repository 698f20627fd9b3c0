// FastSLAM 1.0 module

pub mod config;
pub mod fastslam;
pub mod landmark;
pub mod particle;
pub mod particle_set;

// Re-exports
pub use config::{Execution, FastSlamConfig};
pub use fastslam::FastSlam;
pub use landmark::{LandmarkEstimate, LandmarkStore};
pub use particle::{motion_model, observation_jacobians, Innovation, Particle, LANDMARK_DIM, STATE_DIM};
pub use particle_set::ParticleSet;
