//! Least-squares ellipse fitting.
//!
//! Direct ellipse-specific conic fit (Fitzgibbon et al.) in the numerically
//! stable formulation of Halíř and Flusser. Points are centered and scaled
//! before fitting and the result is mapped back to image coordinates.

use nalgebra::{Matrix3, Vector3};

use crate::models::{Contour, Point2};

/// Fewer boundary points than this never produce a fit.
pub const MIN_ELLIPSE_POINTS: usize = 5;

/// A fitted ellipse in pixel coordinates.
///
/// `width` is the full axis length along `angle_deg`, `height` the full axis
/// length perpendicular to it. Which of the two is the major axis depends on
/// the fit, so `angle_deg` alone does not give the major-axis orientation; use
/// [`EllipseFit::major_axis_angle`] for that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseFit {
    pub center: Point2,
    pub width: f64,
    pub height: f64,
    /// Orientation of the `width` axis in degrees, in `[0, 180)`, measured from
    /// +x towards +y (image rows grow downwards).
    pub angle_deg: f64,
}

impl EllipseFit {
    pub fn major_axis(&self) -> f64 {
        self.width.max(self.height)
    }

    pub fn minor_axis(&self) -> f64 {
        self.width.min(self.height)
    }

    /// Orientation of the longer axis, in `[0, 180)`.
    pub fn major_axis_angle(&self) -> f64 {
        if self.width >= self.height {
            self.angle_deg
        } else {
            (self.angle_deg + 90.0).rem_euclid(180.0)
        }
    }
}

/// Fit an ellipse to a contour. `None` when the contour is too short or degenerate.
pub fn fit_ellipse(contour: &Contour) -> Option<EllipseFit> {
    let points: Vec<Point2> = contour
        .points
        .iter()
        .map(|p| Point2::new(p.x as f64, p.y as f64))
        .collect();
    fit_ellipse_points(&points)
}

/// Fit an ellipse to arbitrary points.
pub fn fit_ellipse_points(points: &[Point2]) -> Option<EllipseFit> {
    if points.len() < MIN_ELLIPSE_POINTS {
        return None;
    }

    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let my = points.iter().map(|p| p.y).sum::<f64>() / n;
    let spread = (points
        .iter()
        .map(|p| (p.x - mx).powi(2) + (p.y - my).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();
    if !(spread > f64::EPSILON) {
        return None;
    }

    // Scatter matrices of the quadratic (x², xy, y²) and linear (x, y, 1) parts.
    let mut s1 = Matrix3::<f64>::zeros();
    let mut s2 = Matrix3::<f64>::zeros();
    let mut s3 = Matrix3::<f64>::zeros();
    for p in points {
        let x = (p.x - mx) / spread;
        let y = (p.y - my) / spread;
        let quad = Vector3::new(x * x, x * y, y * y);
        let lin = Vector3::new(x, y, 1.0);
        s1 += quad * quad.transpose();
        s2 += quad * lin.transpose();
        s3 += lin * lin.transpose();
    }

    // Collinear points leave the linear scatter (numerically) singular.
    if s3.determinant().abs() <= f64::EPSILON * s3.amax().powi(3) {
        return None;
    }
    let t = -s3.try_inverse()? * s2.transpose();
    let m = s1 + s2 * t;
    // Premultiply by the inverse of the constraint matrix [[0,0,2],[0,-1,0],[2,0,0]].
    let reduced = Matrix3::from_rows(&[m.row(2) / 2.0, m.row(1) * -1.0, m.row(0) / 2.0]);

    let quadratic = real_eigenvalues(&reduced)
        .into_iter()
        .filter_map(|lambda| null_vector(&reduced, lambda))
        .map(|v| (4.0 * v[0] * v[2] - v[1] * v[1], v))
        .filter(|(constraint, _)| *constraint > 0.0)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, v)| v)?;
    let linear = t * quadratic;

    let conic = [
        quadratic[0],
        quadratic[1],
        quadratic[2],
        linear[0],
        linear[1],
        linear[2],
    ];
    let fit = conic_to_ellipse(conic)?;

    Some(EllipseFit {
        center: Point2::new(fit.center.x * spread + mx, fit.center.y * spread + my),
        width: fit.width * spread,
        height: fit.height * spread,
        angle_deg: fit.angle_deg,
    })
}

/// Real eigenvalues of a (generally non-symmetric) 3x3 matrix.
fn real_eigenvalues(m: &Matrix3<f64>) -> Vec<f64> {
    let tolerance = 1e-9 * m.amax().max(1.0);
    m.complex_eigenvalues()
        .iter()
        .filter(|z| z.im.abs() <= tolerance)
        .map(|z| z.re)
        .collect()
}

/// Unit vector spanning the null space of `M - λI`: the right singular vector
/// of its smallest singular value.
fn null_vector(m: &Matrix3<f64>, lambda: f64) -> Option<Vector3<f64>> {
    let shifted = m - Matrix3::identity() * lambda;
    let v_t = shifted.svd(false, true).v_t?;
    let v: Vector3<f64> = v_t.row(2).transpose();
    v.iter().all(|c| c.is_finite()).then_some(v)
}

/// Convert `A x² + B xy + C y² + D x + E y + F = 0` to geometric parameters.
fn conic_to_ellipse(conic: [f64; 6]) -> Option<EllipseFit> {
    let sign = if conic[0] + conic[2] < 0.0 { -1.0 } else { 1.0 };
    let [a, b, c, d, e, f] = conic.map(|v| v * sign);

    let den = b * b - 4.0 * a * c;
    if !(den < 0.0) {
        return None;
    }
    let x0 = (2.0 * c * d - b * e) / den;
    let y0 = (2.0 * a * e - b * d) / den;
    let f0 = a * x0 * x0 + b * x0 * y0 + c * y0 * y0 + d * x0 + e * y0 + f;

    let theta = 0.5 * b.atan2(a - c);
    let (sin, cos) = theta.sin_cos();
    let along = a * cos * cos + b * sin * cos + c * sin * sin;
    let across = a * sin * sin - b * sin * cos + c * cos * cos;
    if !(along > 0.0 && across > 0.0 && f0 < 0.0) {
        return None;
    }

    let width = 2.0 * (-f0 / along).sqrt();
    let height = 2.0 * (-f0 / across).sqrt();
    let angle_deg = theta.to_degrees().rem_euclid(180.0);
    if !(width.is_finite() && height.is_finite() && x0.is_finite() && y0.is_finite()) {
        return None;
    }

    Some(EllipseFit {
        center: Point2::new(x0, y0),
        width,
        height,
        angle_deg,
    })
}
