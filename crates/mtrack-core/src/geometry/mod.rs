//! Contour geometry: ellipse fitting and inter-contour distance.

mod distance;
mod ellipse;

pub use distance::approx_contour_distance;
pub use ellipse::{fit_ellipse, fit_ellipse_points, EllipseFit, MIN_ELLIPSE_POINTS};
