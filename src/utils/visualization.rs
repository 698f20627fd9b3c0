//! Visualization utilities for fastslam
//!
//! Provides a unified interface for plotting using gnuplot.

use gnuplot::{Figure, Caption, Color, PointSymbol, PointSize, LineWidth, AxesCommon, AutoOption};
use nalgebra::{Matrix2, SymmetricEigen, Vector2};
use crate::common::{Point2D, Pose2D, SlamError, SlamResult};
use crate::slam::{LandmarkStore, ParticleSet};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const BLUE: &str = "#0000FF";
    pub const CYAN: &str = "#00FFFF";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const LANDMARK: &str = BLACK;
    pub const PARTICLE: &str = GRAY;
    pub const ROBOT: &str = CYAN;
    pub const ESTIMATED: &str = "#35C788";
    pub const GROUND_TRUTH: &str = BLUE;
    pub const LANDMARK_ESTIMATE: &str = "#DD3355";
    pub const DEAD_RECKONING: &str = "#FFA500";
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

/// Main visualizer struct
pub struct Visualizer {
    figure: Figure,
    title: String,
    x_label: String,
    y_label: String,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    /// Create a new visualizer
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            title: String::new(),
            x_label: "x [m]".to_string(),
            y_label: "y [m]".to_string(),
            aspect_ratio: Some(1.0),
        }
    }

    /// Set the plot title
    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Set the axis labels
    pub fn set_labels(&mut self, x_label: &str, y_label: &str) -> &mut Self {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
        self
    }

    /// Set aspect ratio (None for auto)
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Plot a trajectory of poses
    pub fn plot_trajectory(&mut self, poses: &[Pose2D], style: &PathStyle) -> &mut Self {
        let x: Vec<f64> = poses.iter().map(|p| p.x).collect();
        let y: Vec<f64> = poses.iter().map(|p| p.y).collect();

        self.figure.axes2d()
            .lines(&x, &y, &[
                Caption(&style.caption),
                Color(&style.color),
                LineWidth(style.line_width),
            ]);
        self
    }

    /// Plot a scalar series against a shared abscissa (e.g. error over time)
    pub fn plot_series(&mut self, x: &[f64], y: &[f64], style: &PathStyle) -> &mut Self {
        self.figure.axes2d()
            .lines(x, y, &[
                Caption(&style.caption),
                Color(&style.color),
                LineWidth(style.line_width),
            ]);
        self
    }

    /// Plot multiple points
    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let y: Vec<f64> = points.iter().map(|p| p.y).collect();

        self.figure.axes2d()
            .points(&x, &y, &[
                Caption(&style.caption),
                Color(&style.color),
                PointSymbol(style.symbol),
                PointSize(style.size),
            ]);
        self
    }

    /// Plot true landmark positions
    pub fn plot_landmarks(&mut self, landmarks: &[Point2D]) -> &mut Self {
        self.plot_points(
            landmarks,
            &PointStyle::new(colors::LANDMARK, "True Landmarks").with_symbol('*').with_size(2.0),
        )
    }

    /// Plot the particle cloud
    pub fn plot_particles(&mut self, particles: &ParticleSet) -> &mut Self {
        let points: Vec<Point2D> = particles.poses().iter().map(|p| p.position()).collect();
        self.plot_points(
            &points,
            &PointStyle::new(colors::PARTICLE, "Particles").with_symbol('.').with_size(0.5),
        )
    }

    /// Plot tracked landmark means with their 3-sigma ellipses
    pub fn plot_landmark_estimates(&mut self, landmarks: &LandmarkStore) -> &mut Self {
        let means: Vec<Point2D> = landmarks.iter_tracked().map(|(_, lm)| lm.position()).collect();
        self.plot_points(
            &means,
            &PointStyle::new(colors::LANDMARK_ESTIMATE, "Est. Landmarks").with_size(1.5),
        );

        for (_, lm) in landmarks.iter_tracked() {
            let (x, y) = covariance_ellipse(&lm.mean, &lm.covariance, 3.0, 36);
            self.figure.axes2d()
                .lines(&x, &y, &[Color(colors::LANDMARK_ESTIMATE), LineWidth(1.0)]);
        }
        self
    }

    /// Plot robot pose with direction indicator
    pub fn plot_robot(&mut self, pose: &Pose2D, size: f64) -> &mut Self {
        self.figure.axes2d()
            .points(&[pose.x], &[pose.y], &[
                Caption("Robot"),
                Color(colors::ROBOT),
                PointSymbol('O'),
                PointSize(size),
            ]);

        let arrow_len = size * 0.5;
        let end_x = pose.x + arrow_len * pose.yaw.cos();
        let end_y = pose.y + arrow_len * pose.yaw.sin();

        self.figure.axes2d()
            .lines(&[pose.x, end_x], &[pose.y, end_y], &[
                Color(colors::ROBOT),
                LineWidth(2.0),
            ]);
        self
    }

    /// Finalize and show the plot
    pub fn show(&mut self) -> SlamResult<()> {
        self.apply_settings();
        self.figure
            .show()
            .map(|_| ())
            .map_err(|e| SlamError::VisualizationError(e.to_string()))
    }

    /// Save plot to PNG file
    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> SlamResult<()> {
        self.apply_settings();
        self.figure
            .save_to_png(path, width, height)
            .map_err(|e| SlamError::VisualizationError(e.to_string()))
    }

    /// Save plot to SVG file
    pub fn save_svg(&mut self, path: &str) -> SlamResult<()> {
        self.apply_settings();
        self.figure
            .save_to_svg(path, 800, 600)
            .map_err(|e| SlamError::VisualizationError(e.to_string()))
    }

    fn apply_settings(&mut self) {
        let axes = self.figure.axes2d();

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);

        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Outline of the `n_sigma` confidence ellipse of a 2D Gaussian
pub fn covariance_ellipse(
    mean: &Vector2<f64>,
    cov: &Matrix2<f64>,
    n_sigma: f64,
    segments: usize,
) -> (Vec<f64>, Vec<f64>) {
    let sym = 0.5 * (cov + cov.transpose());
    let eigen = SymmetricEigen::new(sym);
    let a = n_sigma * eigen.eigenvalues[0].max(0.0).sqrt();
    let b = n_sigma * eigen.eigenvalues[1].max(0.0).sqrt();
    let axis_a = eigen.eigenvectors.column(0).into_owned();
    let axis_b = eigen.eigenvectors.column(1).into_owned();

    (0..=segments)
        .map(|i| {
            let t = 2.0 * std::f64::consts::PI * i as f64 / segments as f64;
            mean + axis_a * (a * t.cos()) + axis_b * (b * t.sin())
        })
        .map(|p| (p[0], p[1]))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visualizer_creation() {
        let vis = Visualizer::new();
        assert!(vis.aspect_ratio.is_some());
    }

    #[test]
    fn test_path_style() {
        let style = PathStyle::new(colors::RED, "Test Path")
            .with_line_width(3.0);
        assert_eq!(style.line_width, 3.0);
        assert_eq!(style.color, colors::RED);
    }

    #[test]
    fn test_set_labels_for_time_series() {
        let mut vis = Visualizer::new();
        vis.set_labels("time [s]", "error [m]").set_aspect_ratio(None);
        assert_eq!(vis.x_label, "time [s]");
        assert_eq!(vis.y_label, "error [m]");
        assert!(vis.aspect_ratio.is_none());
    }

    #[test]
    fn test_covariance_ellipse_circle() {
        let mean = Vector2::new(1.0, -1.0);
        let (x, y) = covariance_ellipse(&mean, &(Matrix2::identity() * 4.0), 1.0, 12);
        assert_eq!(x.len(), 13);
        for (px, py) in x.iter().zip(y.iter()) {
            let r = ((px - 1.0).powi(2) + (py + 1.0).powi(2)).sqrt();
            assert!((r - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_covariance_ellipse_axes() {
        let (x, y) = covariance_ellipse(&Vector2::zeros(), &Matrix2::new(9.0, 0.0, 0.0, 1.0), 1.0, 360);
        let max_x = x.iter().cloned().fold(f64::MIN, f64::max);
        let max_y = y.iter().cloned().fold(f64::MIN, f64::max);
        assert!((max_x - 3.0).abs() < 1e-6);
        assert!((max_y - 1.0).abs() < 1e-6);
    }
}
