//! Per-particle landmark map
//!
//! Each particle owns a fixed number of landmark slots, one per landmark id
//! the filter was sized for. A slot is either untracked (never seen) or holds
//! an independent 2D Gaussian conditioned on the particle's pose history.

use nalgebra::{Matrix2, Vector2};

use crate::common::{Point2D, SlamError, SlamResult};

/// Gaussian estimate of a single landmark position
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkEstimate {
    pub mean: Vector2<f64>,
    pub covariance: Matrix2<f64>,
}

impl LandmarkEstimate {
    pub fn new(mean: Vector2<f64>, covariance: Matrix2<f64>) -> Self {
        Self { mean, covariance }
    }

    pub fn position(&self) -> Point2D {
        Point2D::from(self.mean)
    }
}

/// Fixed-capacity landmark slots indexed by landmark id
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkStore {
    slots: Vec<Option<LandmarkEstimate>>,
}

impl LandmarkStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Fail if `id` does not name a slot of this store
    pub fn check_id(&self, id: usize) -> SlamResult<()> {
        if id < self.slots.len() {
            Ok(())
        } else {
            Err(SlamError::LandmarkOutOfRange {
                id,
                capacity: self.slots.len(),
            })
        }
    }

    pub fn is_tracked(&self, id: usize) -> bool {
        matches!(self.slots.get(id), Some(Some(_)))
    }

    pub fn get(&self, id: usize) -> Option<&LandmarkEstimate> {
        self.slots.get(id).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> Option<&mut LandmarkEstimate> {
        self.slots.get_mut(id).and_then(|slot| slot.as_mut())
    }

    /// Start tracking landmark `id`, replacing whatever the slot held
    pub(crate) fn insert(&mut self, id: usize, estimate: LandmarkEstimate) -> SlamResult<()> {
        self.check_id(id)?;
        self.slots[id] = Some(estimate);
        Ok(())
    }

    /// Tracked landmarks with their ids, in id order
    pub fn iter_tracked(&self) -> impl Iterator<Item = (usize, &LandmarkEstimate)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|lm| (id, lm)))
    }

    pub fn num_tracked(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
