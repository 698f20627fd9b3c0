//! Particle set operations: batch predict/update, weight normalization,
//! degeneracy-gated resampling and pose extraction.

use log::{debug, warn};
use nalgebra::{Matrix2, Vector3};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::common::{ControlInput, Observation, Pose2D, SlamError, SlamResult};
use crate::slam::config::{validate_noise, Execution};
use crate::slam::particle::{validate_time_step, Particle};

/// Guards the effective sample size against an all-zero weight vector
const NEFF_EPSILON: f64 = 1e-30;

/// Ordered collection of particles with a fixed count
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSet {
    particles: Vec<Particle>,
}

impl ParticleSet {
    /// `count` particles at `initial_pose`, each weighted `1/count`
    pub fn new(count: usize, initial_pose: Pose2D, landmark_capacity: usize) -> SlamResult<Self> {
        if count == 0 {
            return Err(SlamError::InvalidParameter(
                "particle set needs at least one particle".to_string(),
            ));
        }
        let weight = 1.0 / count as f64;
        let particles = (0..count)
            .map(|_| Particle::new(initial_pose, landmark_capacity, weight))
            .collect();
        Ok(Self { particles })
    }

    /// Wrap existing particles; all of them must share one landmark capacity
    pub fn from_particles(particles: Vec<Particle>) -> SlamResult<Self> {
        let capacity = match particles.first() {
            Some(first) => first.landmark_capacity(),
            None => {
                return Err(SlamError::InvalidParameter(
                    "particle set needs at least one particle".to_string(),
                ))
            }
        };
        if let Some(other) = particles.iter().find(|p| p.landmark_capacity() != capacity) {
            return Err(SlamError::InvalidParameter(format!(
                "particles disagree on landmark capacity ({} vs {})",
                capacity,
                other.landmark_capacity()
            )));
        }
        Ok(Self { particles })
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.particles.iter().map(|p| p.weight()).collect()
    }

    /// Particle cloud for display
    pub fn poses(&self) -> Vec<Pose2D> {
        self.particles.iter().map(|p| p.pose()).collect()
    }

    /// Predict every particle and return the weight-blended predicted pose.
    ///
    /// One seed per particle is drawn from `rng` in order, so the result does
    /// not depend on `execution`.
    pub fn predict<R: Rng + ?Sized>(
        &mut self,
        u: &ControlInput,
        q: &Matrix2<f64>,
        dt: f64,
        rng: &mut R,
        execution: Execution,
    ) -> SlamResult<Pose2D> {
        validate_time_step(dt)?;
        validate_noise("q", q)?;

        let seeds: Vec<u64> = (0..self.particles.len()).map(|_| rng.gen()).collect();
        let predict_one = |(particle, &seed): (&mut Particle, &u64)| -> SlamResult<()> {
            let mut particle_rng = StdRng::seed_from_u64(seed);
            particle.predict(u, q, dt, &mut particle_rng).map(|_| ())
        };

        match execution {
            Execution::Serial => self
                .particles
                .iter_mut()
                .zip(seeds.iter())
                .try_for_each(predict_one)?,
            Execution::Parallel => self
                .particles
                .par_iter_mut()
                .zip(seeds.par_iter())
                .try_for_each(predict_one)?,
        }

        Ok(self.weighted_mean())
    }

    /// Update every particle with the same batch, then resample.
    ///
    /// Returns the post-resample pose estimate.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        z: &[Observation],
        r: &Matrix2<f64>,
        threshold_ratio: f64,
        rng: &mut R,
        execution: Execution,
    ) -> SlamResult<Pose2D> {
        validate_noise("r", r)?;
        if let Some(first) = self.particles.first() {
            for obs in z {
                first.landmarks().check_id(obs.landmark_id)?;
            }
        }

        match execution {
            Execution::Serial => self
                .particles
                .iter_mut()
                .try_for_each(|p| p.update(z, r).map(|_| ()))?,
            Execution::Parallel => self
                .particles
                .par_iter_mut()
                .try_for_each(|p| p.update(z, r).map(|_| ()))?,
        }

        self.resample(threshold_ratio, rng);
        Ok(self.estimate_pose())
    }

    /// Scale weights to sum to one, falling back to uniform when they all vanished
    pub fn normalize(&mut self) {
        let n = self.particles.len();
        let sum: f64 = self.particles.iter().map(|p| p.weight()).sum();

        if sum.is_finite() && sum > f64::MIN_POSITIVE {
            let inv = 1.0 / sum;
            for p in self.particles.iter_mut() {
                p.set_weight(p.weight() * inv);
            }
        } else {
            if sum != 0.0 {
                warn!("Weight sum {} is not usable, resetting to uniform weights", sum);
            }
            let uniform = 1.0 / n as f64;
            for p in self.particles.iter_mut() {
                p.set_weight(uniform);
            }
        }
    }

    /// N_eff = 1 / sum(w^2) over the current weights
    pub fn effective_sample_size(&self) -> f64 {
        let sum_w2: f64 = self.particles.iter().map(|p| p.weight() * p.weight()).sum();
        1.0 / (sum_w2 + NEFF_EPSILON)
    }

    /// Weighted mean of the pose blocks (heading blended linearly)
    pub fn estimate_pose(&self) -> Pose2D {
        self.weighted_mean()
    }

    fn weighted_mean(&self) -> Pose2D {
        let x = self
            .particles
            .iter()
            .fold(Vector3::<f64>::zeros(), |acc, p| acc + *p.state() * p.weight());
        Pose2D::from(x)
    }

    /// Highest-weight particle
    pub fn best_particle(&self) -> &Particle {
        // the set is never empty
        self.particles
            .iter()
            .max_by_key(|p| OrderedFloat(p.weight()))
            .unwrap_or(&self.particles[0])
    }

    /// Resample when the weights have degenerated.
    ///
    /// Weights are normalized first. If N_eff stays at or above
    /// `threshold_ratio * len` nothing else happens. Otherwise `len`
    /// uniform draws pick particles through the cumulative weights and the set
    /// is replaced by copies of the picks, in draw order. Copies keep their
    /// weight and the new set is normalized again. Returns whether the set
    /// was replaced.
    pub fn resample<R: Rng + ?Sized>(&mut self, threshold_ratio: f64, rng: &mut R) -> bool {
        self.normalize();

        let n = self.particles.len();
        let n_eff = self.effective_sample_size();
        if n_eff >= n as f64 * threshold_ratio {
            return false;
        }

        let wcum = cumulative_weights(&self.weights());
        let draws: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
        let new_particles: Vec<Particle> = draws
            .iter()
            .map(|&draw| self.particles[select_index(&wcum, draw)].clone())
            .collect();

        debug!("Resampled {} particles (N_eff = {:.2})", n, n_eff);
        self.particles = new_particles;
        self.normalize();
        true
    }
}

/// Running sum of `weights` with the final entry pinned to exactly 1
fn cumulative_weights(weights: &[f64]) -> Vec<f64> {
    let mut wcum: Vec<f64> = weights
        .iter()
        .scan(0.0, |acc, &w| {
            *acc += w;
            Some(*acc)
        })
        .collect();
    if let Some(last) = wcum.last_mut() {
        *last = 1.0;
    }
    wcum
}

/// First index whose cumulative weight reaches `draw`
fn select_index(wcum: &[f64], draw: f64) -> usize {
    wcum.iter()
        .position(|&c| c >= draw)
        .unwrap_or(wcum.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with_weights(weights: &[f64]) -> ParticleSet {
        let particles = weights
            .iter()
            .enumerate()
            .map(|(i, &w)| Particle::new(Pose2D::new(i as f64, -(i as f64), 0.0), 2, w))
            .collect();
        ParticleSet::from_particles(particles).unwrap()
    }

    #[test]
    fn test_new_has_uniform_weights() {
        let set = ParticleSet::new(4, Pose2D::origin(), 3).unwrap();
        assert_eq!(set.len(), 4);
        assert!(set.weights().iter().all(|&w| w == 0.25));
    }

    #[test]
    fn test_empty_set_rejected() {
        assert!(ParticleSet::new(0, Pose2D::origin(), 3).is_err());
        assert!(ParticleSet::from_particles(Vec::new()).is_err());
    }

    #[test]
    fn test_normalize_zero_weights() {
        let mut set = set_with_weights(&[0.0, 0.0, 0.0, 0.0, 0.0]);
        set.normalize();
        assert!(set.weights().iter().all(|&w| w == 0.2));
    }

    #[test]
    fn test_normalize_positive_weights() {
        let original = [1.0, 3.0, 0.5, 0.5];
        let mut set = set_with_weights(&original);
        set.normalize();
        let total: f64 = original.iter().sum();
        let weights = set.weights();
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for (w, o) in weights.iter().zip(original.iter()) {
            assert!((w - o / total).abs() < 1e-12);
        }
    }

    #[test]
    fn test_normalize_idempotent() {
        let mut set = set_with_weights(&[0.2, 0.7, 0.1]);
        set.normalize();
        let once = set.weights();
        set.normalize();
        for (a, b) in once.iter().zip(set.weights().iter()) {
            assert!((a - b).abs() < 1e-15);
        }
    }

    #[test]
    fn test_effective_sample_size() {
        let set = set_with_weights(&[0.25, 0.25, 0.25, 0.25]);
        assert!((set.effective_sample_size() - 4.0).abs() < 1e-9);
        let set = set_with_weights(&[1.0, 0.0, 0.0, 0.0]);
        assert!((set.effective_sample_size() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_pose_weighted_mean() {
        let set = set_with_weights(&[0.25, 0.75]);
        let pose = set.estimate_pose();
        assert!((pose.x - 0.75).abs() < 1e-12);
        assert!((pose.y + 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_resample_skipped_for_uniform_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut set = set_with_weights(&[0.26, 0.24, 0.25, 0.25]);
        let before = set.poses();
        assert!(!set.resample(0.5, &mut rng));
        assert_eq!(set.poses(), before);
    }

    #[test]
    fn test_resample_replaces_degenerate_set() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut weights = vec![1e-9; 10];
        weights[3] = 1.0;
        let mut set = set_with_weights(&weights);
        let dominant = set.particles()[3].clone();

        assert!(set.resample(0.5, &mut rng));
        assert_eq!(set.len(), 10);
        assert!(set.iter().all(|p| p.pose() == dominant.pose()));
        assert!(set.weights().iter().all(|&w| (w - 0.1).abs() < 1e-12));
    }

    #[test]
    fn test_resample_copies_are_independent() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut weights = vec![0.0; 6];
        weights[0] = 1.0;
        let mut set = set_with_weights(&weights);
        assert!(set.resample(0.5, &mut rng));

        let r = Matrix2::new(0.1, 0.0, 0.0, 0.01);
        set.particles[0]
            .update(&[Observation::new(2.0, 0.0, 1)], &r)
            .unwrap();
        assert!(set.particles()[0].landmarks().is_tracked(1));
        assert!(set.iter().skip(1).all(|p| !p.landmarks().is_tracked(1)));
    }

    #[test]
    fn test_cumulative_weights_pins_last() {
        let wcum = cumulative_weights(&[0.3, 0.3, 0.3]);
        assert!((wcum[0] - 0.3).abs() < 1e-12);
        assert!((wcum[1] - 0.6).abs() < 1e-12);
        assert_eq!(wcum[2], 1.0);
    }

    #[test]
    fn test_select_index() {
        let wcum = [0.1, 0.5, 1.0];
        assert_eq!(select_index(&wcum, 0.0), 0);
        assert_eq!(select_index(&wcum, 0.1), 0);
        assert_eq!(select_index(&wcum, 0.3), 1);
        assert_eq!(select_index(&wcum, 0.99), 2);
        assert_eq!(select_index(&wcum, 1.0), 2);
    }

    #[test]
    fn test_best_particle() {
        let set = set_with_weights(&[0.1, 0.6, 0.3]);
        assert_eq!(set.best_particle().pose().x, 1.0);
    }

    #[test]
    fn test_predict_same_seed_serial_and_parallel() {
        let u = ControlInput::new(1.0, 0.1);
        let q = Matrix2::new(0.01, 0.0, 0.0, 0.001);
        let mut serial = ParticleSet::new(16, Pose2D::origin(), 1).unwrap();
        let mut parallel = serial.clone();

        let mut rng_a = StdRng::seed_from_u64(9);
        let mut rng_b = StdRng::seed_from_u64(9);
        for _ in 0..5 {
            serial.predict(&u, &q, 0.1, &mut rng_a, Execution::Serial).unwrap();
            parallel.predict(&u, &q, 0.1, &mut rng_b, Execution::Parallel).unwrap();
        }
        assert_eq!(serial.poses(), parallel.poses());
        // noise spreads the cloud
        let xs: Vec<f64> = serial.poses().iter().map(|p| p.x).collect();
        assert!(xs.iter().any(|&x| (x - xs[0]).abs() > 1e-6));
    }

    #[test]
    fn test_update_rejects_unknown_landmark() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut set = ParticleSet::new(3, Pose2D::origin(), 2).unwrap();
        let r = Matrix2::identity();
        let result = set.update(&[Observation::new(1.0, 0.0, 7)], &r, 0.5, &mut rng, Execution::Serial);
        assert_eq!(result, Err(SlamError::LandmarkOutOfRange { id: 7, capacity: 2 }));
        assert!(set.iter().all(|p| p.landmarks().num_tracked() == 0));
    }

    #[test]
    fn test_from_particles_rejects_mixed_capacities() {
        let particles = vec![
            Particle::new(Pose2D::origin(), 3, 0.5),
            Particle::new(Pose2D::origin(), 1, 0.5),
        ];
        assert!(matches!(
            ParticleSet::from_particles(particles),
            Err(SlamError::InvalidParameter(_))
        ));
    }
}
