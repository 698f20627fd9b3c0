//! Error types for fastslam

use std::fmt;

/// Main error type for the estimator and its harness
#[derive(Debug, Clone, PartialEq)]
pub enum SlamError {
    /// Invalid parameter (non-positive time step, negative variance, ...)
    InvalidParameter(String),
    /// Observation refers to a landmark slot the filter was not sized for
    LandmarkOutOfRange { id: usize, capacity: usize },
    /// Visualization error
    VisualizationError(String),
}

impl fmt::Display for SlamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlamError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            SlamError::LandmarkOutOfRange { id, capacity } => write!(
                f,
                "Landmark id {} out of range (capacity {})",
                id, capacity
            ),
            SlamError::VisualizationError(msg) => write!(f, "Visualization error: {}", msg),
        }
    }
}

impl std::error::Error for SlamError {}

/// Result type alias for fastslam operations
pub type SlamResult<T> = Result<T, SlamError>;
