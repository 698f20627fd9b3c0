//! FastSLAM 1.0
//!
//! Rao-Blackwellized particle filter: the robot pose posterior is carried by
//! a particle population, and every particle keeps an independent EKF per
//! landmark. One time step is `predict` (sample motion per particle) followed
//! by `update` (per-landmark EKF, importance weighting, resampling).

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::common::{ControlInput, Observation, Pose2D, SlamResult, StateEstimator};
use crate::slam::config::FastSlamConfig;
use crate::slam::particle::Particle;
use crate::slam::particle_set::ParticleSet;

/// FastSLAM filter owning its particles and random source
pub struct FastSlam {
    config: FastSlamConfig,
    particles: ParticleSet,
    rng: StdRng,
    estimate: Pose2D,
}

impl FastSlam {
    /// Create a filter with every particle at `config.initial_pose`
    pub fn new(config: FastSlamConfig) -> SlamResult<Self> {
        config.validate()?;
        let particles = ParticleSet::new(
            config.num_particles,
            config.initial_pose,
            config.landmark_capacity,
        )?;
        let rng = StdRng::seed_from_u64(config.seed);
        let estimate = particles.estimate_pose();

        Ok(FastSlam {
            config,
            particles,
            rng,
            estimate,
        })
    }

    /// Create with default configuration
    pub fn with_defaults() -> SlamResult<Self> {
        Self::new(FastSlamConfig::default())
    }

    pub fn config(&self) -> &FastSlamConfig {
        &self.config
    }

    /// Current particle cloud
    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    /// Pose estimate produced by the latest update
    pub fn estimate(&self) -> Pose2D {
        self.estimate
    }

    pub fn best_particle(&self) -> &Particle {
        self.particles.best_particle()
    }

    pub fn effective_sample_size(&self) -> f64 {
        self.particles.effective_sample_size()
    }

    /// Motion step for every particle.
    ///
    /// The returned weight-blended pose is diagnostic only; each particle
    /// keeps its own predicted pose and the estimate is not changed.
    pub fn predict(&mut self, u: &ControlInput, dt: f64) -> SlamResult<Pose2D> {
        self.particles
            .predict(u, &self.config.q, dt, &mut self.rng, self.config.execution)
    }

    /// Measurement step for every particle followed by resampling.
    ///
    /// Returns the post-resample pose estimate.
    pub fn update(&mut self, z: &[Observation]) -> SlamResult<Pose2D> {
        let estimate = self.particles.update(
            z,
            &self.config.r,
            self.config.resample_threshold_ratio,
            &mut self.rng,
            self.config.execution,
        )?;
        debug!(
            "Update with {} observations -> ({:.3}, {:.3}, {:.3}), N_eff {:.1}",
            z.len(),
            estimate.x,
            estimate.y,
            estimate.yaw,
            self.particles.effective_sample_size()
        );
        self.estimate = estimate;
        Ok(estimate)
    }

    /// One full time step: predict with `u` over `dt`, then update with `z`
    pub fn step(&mut self, u: &ControlInput, z: &[Observation], dt: f64) -> SlamResult<Pose2D> {
        self.predict(u, dt)?;
        self.update(z)
    }
}

impl StateEstimator for FastSlam {
    type State = Pose2D;
    type Measurement = Vec<Observation>;
    type Control = ControlInput;

    fn predict(&mut self, control: &Self::Control, dt: f64) -> SlamResult<Self::State> {
        FastSlam::predict(self, control, dt)
    }

    fn update(&mut self, measurement: &Self::Measurement) -> SlamResult<Self::State> {
        FastSlam::update(self, measurement)
    }

    fn get_state(&self) -> &Self::State {
        &self.estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SlamError;
    use crate::slam::config::Execution;
    use nalgebra::{Matrix2, Vector2};
    use std::f64::consts::PI;

    fn noiseless_config() -> FastSlamConfig {
        FastSlamConfig::default()
            .with_num_particles(10)
            .with_landmark_capacity(1)
            .with_process_noise(Matrix2::zeros())
            .with_measurement_noise(Matrix2::new(1e-4, 0.0, 0.0, 1e-6))
    }

    fn observe(pose: &Pose2D, landmark: &Vector2<f64>, id: usize) -> Observation {
        let dx = landmark[0] - pose.x;
        let dy = landmark[1] - pose.y;
        Observation::new((dx * dx + dy * dy).sqrt(), dy.atan2(dx), id)
    }

    #[test]
    fn test_fastslam_creation() {
        let slam = FastSlam::with_defaults().unwrap();
        assert_eq!(slam.particles().len(), 50);
        assert_eq!(slam.estimate(), Pose2D::origin());
        assert!((slam.effective_sample_size() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = FastSlamConfig::default().with_landmark_capacity(0);
        assert!(matches!(FastSlam::new(config), Err(SlamError::InvalidParameter(_))));
    }

    #[test]
    fn test_predict_rejects_non_positive_dt() {
        let mut slam = FastSlam::new(noiseless_config()).unwrap();
        assert!(slam.predict(&ControlInput::new(1.0, 0.0), 0.0).is_err());
        assert!(slam.particles().iter().all(|p| p.pose() == Pose2D::origin()));
    }

    #[test]
    fn test_update_rejects_out_of_range_landmark() {
        let mut slam = FastSlam::new(noiseless_config()).unwrap();
        let result = slam.update(&[Observation::new(1.0, 0.0, 1)]);
        assert_eq!(result, Err(SlamError::LandmarkOutOfRange { id: 1, capacity: 1 }));
    }

    #[test]
    fn test_noiseless_landmark_convergence() {
        let mut slam = FastSlam::new(noiseless_config()).unwrap();
        let landmark = Vector2::new(10.0, 0.0);
        let u = ControlInput::new(1.0, 0.0);
        let dt = 0.1;
        let mut truth = Pose2D::origin();

        for _ in 0..90 {
            slam.predict(&u, dt).unwrap();
            truth.x += u.v * dt;
        }
        assert!((slam.particles().estimate_pose().x - 9.0).abs() < 1e-9);

        for _ in 0..5 {
            let z = observe(&truth, &landmark, 0);
            assert!((z.range - 1.0).abs() < 1e-6);
            assert!(z.bearing.abs() < 1e-9);
            slam.update(&[z]).unwrap();
        }

        for p in slam.particles().iter() {
            let lm = p.landmarks().get(0).unwrap();
            assert!((lm.mean - landmark).norm() < 1e-2);
        }
        let est = slam.estimate();
        assert!((est.x - truth.x).abs() < 1e-6);
        assert!(est.y.abs() < 1e-9);
        assert_eq!(est.yaw, 0.0);
    }

    #[test]
    fn test_step_matches_predict_then_update() {
        let config = FastSlamConfig::default().with_landmark_capacity(2).with_seed(11);
        let mut a = FastSlam::new(config.clone()).unwrap();
        let mut b = FastSlam::new(config).unwrap();
        let u = ControlInput::new(1.0, 0.1);
        let z = vec![Observation::new(5.0, 0.3, 0), Observation::new(7.0, -1.2, 1)];

        for _ in 0..10 {
            let ea = a.step(&u, &z, 0.1).unwrap();
            b.predict(&u, 0.1).unwrap();
            let eb = b.update(&z).unwrap();
            assert_eq!(ea, eb);
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible_across_execution_modes() {
        let config = FastSlamConfig::default().with_landmark_capacity(2).with_seed(3);
        let mut serial = FastSlam::new(config.clone()).unwrap();
        let mut parallel = FastSlam::new(config.with_execution(Execution::Parallel)).unwrap();
        let u = ControlInput::new(1.0, 5.0_f64.to_radians());
        let landmarks = [Vector2::new(10.0, -2.0), Vector2::new(15.0, 10.0)];
        let mut truth = Pose2D::origin();

        for _ in 0..30 {
            truth.x += u.v * truth.yaw.cos() * 0.1;
            truth.y += u.v * truth.yaw.sin() * 0.1;
            truth.yaw += u.omega * 0.1;
            let z: Vec<Observation> = landmarks
                .iter()
                .enumerate()
                .map(|(id, lm)| observe(&truth, lm, id))
                .collect();
            let es = serial.step(&u, &z, 0.1).unwrap();
            let ep = parallel.step(&u, &z, 0.1).unwrap();
            assert_eq!(es, ep);
        }
        assert_eq!(serial.particles(), parallel.particles());
    }

    #[test]
    fn test_noisy_sensor_landmarks_converge() {
        use crate::common::{ControlSource, ObservationSource};
        use crate::simulation::{Room, Vehicle, VehicleNoise};

        let room = Room::from_landmarks(&[(10.0, -2.0), (15.0, 10.0)]);
        let truth: Vec<Vector2<f64>> = room.landmarks().iter().map(|p| p.to_vector()).collect();
        let noise = VehicleNoise {
            v_std: 0.0,
            omega_std: 0.0,
            ..VehicleNoise::default()
        };
        let mut vehicle = Vehicle::new(room, Pose2D::origin(), noise, 21).unwrap();
        let config = FastSlamConfig::default()
            .with_num_particles(20)
            .with_landmark_capacity(2)
            .with_process_noise(Matrix2::zeros())
            .with_measurement_noise(Matrix2::new(
                0.1_f64.powi(2), 0.0,
                0.0, 1.0_f64.to_radians().powi(2),
            ));
        let mut slam = FastSlam::new(config).unwrap();
        let command = ControlInput::new(1.0, 0.0);

        for _ in 0..100 {
            vehicle.move_step(&command, 0.1).unwrap();
            let u = vehicle.control();
            let z = vehicle.observe();
            slam.step(&u, &z, 0.1).unwrap();
        }

        let best = slam.best_particle();
        for (id, lm) in best.landmarks().iter_tracked() {
            assert!((lm.mean - truth[id]).norm() < 0.3, "landmark {} at {:?}", id, lm.mean);
        }
        assert_eq!(best.landmarks().num_tracked(), 2);
        assert!((slam.estimate().x - vehicle.pose().x).abs() < 1e-6);
    }

    #[test]
    fn test_state_estimator_interface() {
        let mut slam = FastSlam::new(noiseless_config()).unwrap();
        let estimator: &mut dyn StateEstimator<
            State = Pose2D,
            Measurement = Vec<Observation>,
            Control = ControlInput,
        > = &mut slam;
        estimator.predict(&ControlInput::new(1.0, 0.0), 0.1).unwrap();
        let est = estimator
            .update(&vec![Observation::new(2.0, PI / 4.0, 0)])
            .unwrap();
        assert_eq!(estimator.get_state(), &est);
        assert!((est.x - 0.1).abs() < 1e-12);
    }
}
