//! Configuration for the FastSLAM filter

use nalgebra::Matrix2;

use crate::common::{Pose2D, SlamError, SlamResult};

/// How per-particle predict/update work is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Serial,
    /// Spread particles over the rayon thread pool
    Parallel,
}

/// Configuration for FastSLAM
#[derive(Debug, Clone)]
pub struct FastSlamConfig {
    /// Number of particles, constant for the filter's lifetime
    pub num_particles: usize,
    /// Number of landmark slots per particle; observation ids must be below it
    pub landmark_capacity: usize,
    /// Pose every particle starts from
    pub initial_pose: Pose2D,
    /// Process noise covariance on (v, omega). Only the diagonal is used.
    pub q: Matrix2<f64>,
    /// Measurement noise covariance on (range, bearing)
    pub r: Matrix2<f64>,
    /// Resample when N_eff drops below this fraction of the particle count
    pub resample_threshold_ratio: f64,
    /// Seed of the filter's random source
    pub seed: u64,
    pub execution: Execution,
}

impl Default for FastSlamConfig {
    fn default() -> Self {
        let one_deg = 1.0_f64.to_radians();
        Self {
            num_particles: 50,
            landmark_capacity: 8,
            initial_pose: Pose2D::origin(),
            q: Matrix2::new(
                0.1_f64.powi(2), 0.0,
                0.0, one_deg.powi(2),
            ),
            r: Matrix2::new(
                0.1, 0.0,
                0.0, one_deg,
            ),
            resample_threshold_ratio: 0.5,
            seed: 42,
            execution: Execution::Serial,
        }
    }
}

impl FastSlamConfig {
    pub fn with_num_particles(mut self, num_particles: usize) -> Self {
        self.num_particles = num_particles;
        self
    }

    pub fn with_landmark_capacity(mut self, capacity: usize) -> Self {
        self.landmark_capacity = capacity;
        self
    }

    pub fn with_initial_pose(mut self, pose: Pose2D) -> Self {
        self.initial_pose = pose;
        self
    }

    pub fn with_process_noise(mut self, q: Matrix2<f64>) -> Self {
        self.q = q;
        self
    }

    pub fn with_measurement_noise(mut self, r: Matrix2<f64>) -> Self {
        self.r = r;
        self
    }

    pub fn with_resample_threshold_ratio(mut self, ratio: f64) -> Self {
        self.resample_threshold_ratio = ratio;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Check the configuration for values the filter cannot run with
    pub fn validate(&self) -> SlamResult<()> {
        if self.num_particles == 0 {
            return Err(SlamError::InvalidParameter(
                "num_particles must be positive".to_string(),
            ));
        }
        if self.landmark_capacity == 0 {
            return Err(SlamError::InvalidParameter(
                "landmark_capacity must be positive".to_string(),
            ));
        }
        if !self.resample_threshold_ratio.is_finite()
            || !(0.0..=1.0).contains(&self.resample_threshold_ratio)
        {
            return Err(SlamError::InvalidParameter(format!(
                "resample_threshold_ratio must lie in [0, 1], got {}",
                self.resample_threshold_ratio
            )));
        }
        let pose = self.initial_pose.to_vector();
        if pose.iter().any(|v| !v.is_finite()) {
            return Err(SlamError::InvalidParameter(format!(
                "initial_pose must be finite, got {:?}",
                self.initial_pose
            )));
        }
        validate_noise("q", &self.q)?;
        validate_noise("r", &self.r)
    }
}

/// Reject noise matrices with non-finite entries or negative variances
pub(crate) fn validate_noise(name: &str, m: &Matrix2<f64>) -> SlamResult<()> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(SlamError::InvalidParameter(format!(
            "{} must be finite, got {:?}",
            name, m
        )));
    }
    if m[(0, 0)] < 0.0 || m[(1, 1)] < 0.0 {
        return Err(SlamError::InvalidParameter(format!(
            "{} variances must be non-negative, got diag({}, {})",
            name,
            m[(0, 0)],
            m[(1, 1)]
        )));
    }
    Ok(())
}
