use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::common::{
    normalize_angle, ControlInput, ControlSource, Observation, ObservationSource, Pose2D,
    SlamError, SlamResult,
};
use crate::simulation::world::Room;
use crate::slam::motion_model;

/// Maximum observation range [m]
pub const MAX_RANGE: f64 = 20.0;

/// Standard deviations of the synthetic odometry and sensor noise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleNoise {
    pub v_std: f64,
    pub omega_std: f64,
    pub range_std: f64,
    pub bearing_std: f64,
}

impl VehicleNoise {
    pub fn noiseless() -> Self {
        Self {
            v_std: 0.0,
            omega_std: 0.0,
            range_std: 0.0,
            bearing_std: 0.0,
        }
    }
}

impl Default for VehicleNoise {
    fn default() -> Self {
        let one_deg = 1.0_f64.to_radians();
        Self {
            v_std: 0.1,
            omega_std: one_deg,
            range_std: 0.1,
            bearing_std: one_deg,
        }
    }
}

/// Ground-truth vehicle driving through a `Room`.
///
/// Reports noisy odometry as its control input and noisy world-frame
/// range/bearing observations of every landmark closer than `max_range`.
pub struct Vehicle {
    room: Room,
    pose: Pose2D,
    odometry: ControlInput,
    max_range: f64,
    v_noise: Normal<f64>,
    omega_noise: Normal<f64>,
    range_noise: Normal<f64>,
    bearing_noise: Normal<f64>,
    rng: StdRng,
}

fn normal(std: f64, what: &str) -> SlamResult<Normal<f64>> {
    if !(std >= 0.0) {
        return Err(SlamError::InvalidParameter(format!(
            "{} std must be non-negative, got {}",
            what, std
        )));
    }
    Normal::new(0.0, std)
        .map_err(|e| SlamError::InvalidParameter(format!("{} std {}: {}", what, std, e)))
}

impl Vehicle {
    pub fn new(room: Room, initial_pose: Pose2D, noise: VehicleNoise, seed: u64) -> SlamResult<Self> {
        Ok(Vehicle {
            room,
            pose: initial_pose,
            odometry: ControlInput::zero(),
            max_range: MAX_RANGE,
            v_noise: normal(noise.v_std, "speed")?,
            omega_noise: normal(noise.omega_std, "turn rate")?,
            range_noise: normal(noise.range_std, "range")?,
            bearing_noise: normal(noise.bearing_std, "bearing")?,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn with_max_range(mut self, max_range: f64) -> Self {
        self.max_range = max_range;
        self
    }

    /// True pose
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Drive with `command` for `dt`, then record a noisy reading of it as odometry
    pub fn move_step(&mut self, command: &ControlInput, dt: f64) -> SlamResult<Pose2D> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SlamError::InvalidParameter(format!(
                "time step must be positive, got {}",
                dt
            )));
        }
        self.pose = Pose2D::from(motion_model(&self.pose.to_vector(), &command.to_vector(), dt));
        self.odometry = ControlInput::new(
            command.v + self.v_noise.sample(&mut self.rng),
            command.omega + self.omega_noise.sample(&mut self.rng),
        );
        Ok(self.pose)
    }
}

impl ControlSource for Vehicle {
    fn control(&self) -> ControlInput {
        self.odometry
    }
}

impl ObservationSource for Vehicle {
    fn observe(&mut self) -> Vec<Observation> {
        let mut z = Vec::new();
        for (lm_id, lm) in self.room.landmarks().iter().enumerate() {
            let dx = lm.x - self.pose.x;
            let dy = lm.y - self.pose.y;
            let d = (dx * dx + dy * dy).sqrt();
            if d < self.max_range {
                let d_noisy = d + self.range_noise.sample(&mut self.rng);
                let angle_noisy =
                    normalize_angle(dy.atan2(dx) + self.bearing_noise.sample(&mut self.rng));
                z.push(Observation::new(d_noisy, angle_noisy, lm_id));
            }
        }
        z
    }
}
