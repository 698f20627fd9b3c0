//! Utility modules for fastslam

pub mod visualization;

pub use visualization::{colors, covariance_ellipse, PathStyle, PointStyle, Visualizer};
