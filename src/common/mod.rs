//! Common types, traits, and error definitions for fastslam
//!
//! This module provides the foundational building blocks shared by the
//! estimator, the simulation harness and the plotting utilities.

pub mod error;
pub mod geometry;
pub mod traits;
pub mod types;

pub use error::*;
pub use geometry::*;
pub use traits::*;
pub use types::*;
