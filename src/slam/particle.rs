//! FastSLAM particle
//!
//! A particle is one hypothesis of the robot pose together with its own map:
//! an independent EKF per landmark, conditioned on that pose. The pose block
//! is never corrected by observations; pose uncertainty lives in the spread
//! of the particle population.

use log::{debug, trace, warn};
use nalgebra::{Matrix2, Matrix2x3, Vector2, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::common::{
    gaussian_density, normalize_angle, polar_jacobian, polar_to_cartesian, ControlInput,
    Observation, Pose2D, SlamError, SlamResult,
};
use crate::slam::config::validate_noise;
use crate::slam::landmark::{LandmarkEstimate, LandmarkStore};

/// Size of the pose block (x, y, yaw)
pub const STATE_DIM: usize = 3;
/// Size of one landmark mean (x, y)
pub const LANDMARK_DIM: usize = 2;

/// Particle for FastSLAM
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pose: Vector3<f64>,
    landmarks: LandmarkStore,
    weight: f64,
}

/// Linearized observation of a tracked landmark
#[derive(Debug, Clone, PartialEq)]
pub struct Innovation {
    /// observed - predicted (range, bearing), bearing normalized
    pub residual: Vector2<f64>,
    /// Jacobian w.r.t. the robot pose
    pub hx: Matrix2x3<f64>,
    /// Jacobian w.r.t. the landmark position
    pub hlm: Matrix2<f64>,
    /// Innovation covariance
    pub s: Matrix2<f64>,
}

impl Particle {
    pub fn new(initial_pose: Pose2D, landmark_capacity: usize, weight: f64) -> Self {
        let mut pose = initial_pose.to_vector();
        pose[2] = normalize_angle(pose[2]);
        Particle {
            pose,
            landmarks: LandmarkStore::new(landmark_capacity),
            weight,
        }
    }

    pub fn pose(&self) -> Pose2D {
        Pose2D::from(self.pose)
    }

    /// Pose block as a vector
    pub fn state(&self) -> &Vector3<f64> {
        &self.pose
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub(crate) fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub fn landmarks(&self) -> &LandmarkStore {
        &self.landmarks
    }

    pub fn landmark_capacity(&self) -> usize {
        self.landmarks.capacity()
    }

    /// Propagate the pose with a noise-perturbed control input.
    ///
    /// `q` holds the variances of the speed and turn-rate noise on its
    /// diagonal; each channel is perturbed independently.
    pub fn predict<R: Rng + ?Sized>(
        &mut self,
        u: &ControlInput,
        q: &Matrix2<f64>,
        dt: f64,
        rng: &mut R,
    ) -> SlamResult<Pose2D> {
        validate_time_step(dt)?;
        validate_noise("q", q)?;

        let u_noisy = sample_control(u, q, rng)?;
        self.pose = motion_model(&self.pose, &u_noisy, dt);
        Ok(self.pose())
    }

    /// Incorporate one observation batch.
    ///
    /// The weight restarts at 1 and accumulates the likelihood of every
    /// observation of an already tracked landmark. Returns the pose and the
    /// resulting weight.
    pub fn update(&mut self, z: &[Observation], r: &Matrix2<f64>) -> SlamResult<(Pose2D, f64)> {
        for obs in z {
            self.landmarks.check_id(obs.landmark_id)?;
        }

        self.weight = 1.0;
        for obs in z {
            self.update_one_landmark(obs, r)?;
        }

        Ok((self.pose(), self.weight))
    }

    /// Initialize the landmark on first sight, otherwise weight and correct it
    pub fn update_one_landmark(&mut self, z: &Observation, r: &Matrix2<f64>) -> SlamResult<()> {
        let lm_id = z.landmark_id;
        self.landmarks.check_id(lm_id)?;

        if !self.landmarks.is_tracked(lm_id) {
            return self.add_landmark(z, r);
        }

        self.compute_weight(z);

        let innovation = match self.calc_innovation(z, r) {
            Some(innovation) => innovation,
            None => {
                debug!("Landmark {} coincides with particle position, skipping correction", lm_id);
                return Ok(());
            }
        };
        let s_inv = match innovation.s.try_inverse() {
            Some(s_inv) => s_inv,
            None => {
                warn!("Singular innovation covariance for landmark {}, skipping correction", lm_id);
                return Ok(());
            }
        };

        if let Some(lm) = self.landmarks.get_mut(lm_id) {
            let p = lm.covariance;
            let k = p * innovation.hlm.transpose() * s_inv;
            lm.mean += k * innovation.residual;
            lm.covariance = p - k * innovation.hlm * p;
        }
        Ok(())
    }

    fn add_landmark(&mut self, z: &Observation, r: &Matrix2<f64>) -> SlamResult<()> {
        let mean = polar_to_cartesian(&self.position(), z.range, z.bearing);
        let g_r = polar_jacobian(z.range, z.bearing);
        let covariance = g_r * r * g_r.transpose();

        trace!("Landmark {} initialized at ({:.3}, {:.3})", z.landmark_id, mean[0], mean[1]);
        self.landmarks
            .insert(z.landmark_id, LandmarkEstimate::new(mean, covariance))
    }

    /// Multiply the weight by the Gaussian likelihood of the observation.
    ///
    /// The residual is taken in Cartesian space between the projected
    /// observation and the stored mean, under the landmark covariance alone.
    /// A singular covariance leaves the weight untouched.
    fn compute_weight(&mut self, z: &Observation) {
        let lm = match self.landmarks.get(z.landmark_id) {
            Some(lm) => lm,
            None => return,
        };
        let x_l = polar_to_cartesian(&self.position(), z.range, z.bearing);
        let residual = x_l - lm.mean;

        match gaussian_density(&residual, &lm.covariance) {
            Some(likelihood) => {
                trace!("Landmark {} likelihood {:e}", z.landmark_id, likelihood);
                self.weight *= likelihood;
            }
            None => trace!("Landmark {} covariance singular, weight unchanged", z.landmark_id),
        }
    }

    /// Predicted measurement residual and Jacobians for a tracked landmark.
    ///
    /// Returns `None` when the landmark is not tracked or sits exactly on the
    /// particle position, where the Jacobians are undefined.
    pub fn calc_innovation(&self, z: &Observation, r: &Matrix2<f64>) -> Option<Innovation> {
        let lm = self.landmarks.get(z.landmark_id)?;
        let dx = lm.mean[0] - self.pose[0];
        let dy = lm.mean[1] - self.pose[1];
        let square_distance = dx * dx + dy * dy;
        let distance = square_distance.sqrt();
        let (hx, hlm) = observation_jacobians(dx, dy)?;

        let z_pred = Vector2::new(distance, dy.atan2(dx));
        let mut residual = z.to_vector() - z_pred;
        residual[1] = normalize_angle(residual[1]);

        let s = hlm * lm.covariance * hlm.transpose() + r;
        Some(Innovation { residual, hx, hlm, s })
    }

    fn position(&self) -> Vector2<f64> {
        Vector2::new(self.pose[0], self.pose[1])
    }
}

/// Unicycle motion model
pub fn motion_model(x: &Vector3<f64>, u: &Vector2<f64>, dt: f64) -> Vector3<f64> {
    let yaw = x[2];
    Vector3::new(
        x[0] + u[0] * yaw.cos() * dt,
        x[1] + u[0] * yaw.sin() * dt,
        normalize_angle(x[2] + u[1] * dt),
    )
}

/// Jacobians of the world-frame range/bearing model w.r.t. pose and landmark.
///
/// `(dx, dy)` is the landmark position relative to the robot. Returns `None`
/// for a zero offset.
pub fn observation_jacobians(dx: f64, dy: f64) -> Option<(Matrix2x3<f64>, Matrix2<f64>)> {
    let q = dx * dx + dy * dy;
    if !(q > 0.0) {
        return None;
    }
    let d = q.sqrt();

    let hx = Matrix2x3::new(
        -dx / d, -dy / d, 0.0,
        dy / q, -dx / q, 0.0,
    );
    let hlm = Matrix2::new(
        dx / d, dy / d,
        -dy / q, dx / q,
    );
    Some((hx, hlm))
}

pub(crate) fn validate_time_step(dt: f64) -> SlamResult<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(SlamError::InvalidParameter(format!(
            "time step must be positive, got {}",
            dt
        )))
    }
}

fn sample_control<R: Rng + ?Sized>(
    u: &ControlInput,
    q: &Matrix2<f64>,
    rng: &mut R,
) -> SlamResult<Vector2<f64>> {
    let noise_v = Normal::new(0.0, q[(0, 0)].sqrt())
        .map_err(|e| SlamError::InvalidParameter(format!("speed noise: {}", e)))?;
    let noise_omega = Normal::new(0.0, q[(1, 1)].sqrt())
        .map_err(|e| SlamError::InvalidParameter(format!("turn rate noise: {}", e)))?;

    Ok(Vector2::new(
        u.v + noise_v.sample(rng),
        u.omega + noise_omega.sample(rng),
    ))
}
