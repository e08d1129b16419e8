//! Approximate contour-to-contour distance.

use crate::models::Contour;

/// Number of samples taken along the first contour.
const SAMPLES_PER_CONTOUR: usize = 20;

/// Approximate minimum distance between two contours, in pixels.
///
/// Both contours are subsampled with the stride `max(1, a.len() / 20)` taken
/// from the first contour, and the minimum Euclidean distance over the sampled
/// cross product is returned. This is an O(n²) approximation and can
/// overestimate the true closest-point distance by up to one stride. Returns
/// `f64::INFINITY` when either contour is empty.
pub fn approx_contour_distance(a: &Contour, b: &Contour) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }
    let step = (a.len() / SAMPLES_PER_CONTOUR).max(1);

    let mut min_sq = i64::MAX;
    for p in a.points.iter().step_by(step) {
        for q in b.points.iter().step_by(step) {
            let dx = (p.x - q.x) as i64;
            let dy = (p.y - q.y) as i64;
            min_sq = min_sq.min(dx * dx + dy * dy);
        }
    }
    (min_sq as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point;

    fn vertical_line(x: i32, len: i32) -> Contour {
        Contour::new((0..len).map(|y| Point::new(x, y)).collect())
    }

    #[test]
    fn test_distance_between_parallel_lines() {
        let a = vertical_line(0, 10);
        let b = vertical_line(7, 10);
        assert_eq!(approx_contour_distance(&a, &b), 7.0);
    }

    #[test]
    fn test_distance_is_symmetric_for_short_contours() {
        let a = Contour::new(vec![Point::new(0, 0), Point::new(1, 0)]);
        let b = Contour::new(vec![Point::new(4, 4), Point::new(3, 4)]);
        assert_eq!(approx_contour_distance(&a, &b), approx_contour_distance(&b, &a));
    }

    #[test]
    fn test_subsampling_can_overestimate() {
        // 40 points -> stride 2; the only close point on `b` sits at an odd index.
        let a = vertical_line(0, 40);
        let mut points: Vec<_> = (0..40).map(|y| Point::new(100, y)).collect();
        points[1] = Point::new(1, 1);
        let b = Contour::new(points);
        assert!(approx_contour_distance(&a, &b) > 1.0);
    }

    #[test]
    fn test_empty_contour_is_infinitely_far() {
        let a = vertical_line(0, 5);
        assert!(approx_contour_distance(&a, &Contour::default()).is_infinite());
    }
}
