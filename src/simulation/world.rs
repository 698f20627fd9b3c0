use crate::common::Point2D;

/// Static landmark layout; a landmark's id is its insertion index
#[derive(Debug, Clone, Default)]
pub struct Room {
    landmarks: Vec<Point2D>,
}

impl Room {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_landmarks(landmarks: &[(f64, f64)]) -> Self {
        Self {
            landmarks: landmarks.iter().map(|&p| Point2D::from(p)).collect(),
        }
    }

    /// Add a landmark and return its id
    pub fn add_landmark(&mut self, x: f64, y: f64) -> usize {
        self.landmarks.push(Point2D::new(x, y));
        self.landmarks.len() - 1
    }

    pub fn landmarks(&self) -> &[Point2D] {
        &self.landmarks
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}
