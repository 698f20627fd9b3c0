//! Simulation harness for the estimator
//!
//! Ground-truth landmark layout and vehicle kinematics, plus the noise
//! injection used to manufacture synthetic odometry and observations. The
//! filter only sees this module through `ControlSource` and
//! `ObservationSource`.

pub mod vehicle;
pub mod world;

pub use vehicle::{Vehicle, VehicleNoise};
pub use world::Room;
