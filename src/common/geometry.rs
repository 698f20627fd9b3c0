//! Small geometry helpers shared by the filter and the simulation harness

use nalgebra::{Matrix2, Vector2};
use std::f64::consts::PI;

/// Normalize angle to (-pi, pi]
pub fn normalize_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let a = angle.rem_euclid(2.0 * PI);
    if a > PI {
        a - 2.0 * PI
    } else {
        a
    }
}

/// Project a world-frame (range, bearing) pair from `origin` into Cartesian coordinates.
pub fn polar_to_cartesian(origin: &Vector2<f64>, range: f64, bearing: f64) -> Vector2<f64> {
    Vector2::new(
        origin[0] + range * bearing.cos(),
        origin[1] + range * bearing.sin(),
    )
}

/// Jacobian of `polar_to_cartesian` with respect to (range, bearing)
pub fn polar_jacobian(range: f64, bearing: f64) -> Matrix2<f64> {
    let (s, c) = bearing.sin_cos();
    Matrix2::new(
        c, -range * s,
        s, range * c,
    )
}

/// Bivariate Gaussian density of `residual` under covariance `cov`.
///
/// Returns `None` when `cov` cannot be inverted or its determinant is not
/// positive, in which case the density is undefined.
pub fn gaussian_density(residual: &Vector2<f64>, cov: &Matrix2<f64>) -> Option<f64> {
    let det = cov.determinant();
    if !(det > 0.0) {
        return None;
    }
    let cov_inv = cov.try_inverse()?;
    let mahal = (residual.transpose() * cov_inv * residual)[(0, 0)];
    Some((-0.5 * mahal).exp() / (2.0 * PI * det.sqrt()))
}
