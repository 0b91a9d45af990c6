//! WGS-84 geodesic distance and path length.

use geo::{Distance, Geodesic, Point};

use crate::model::WayPoint;

/// Geodesic distance in meters between two points on the WGS-84 ellipsoid.
pub fn distance_m(a: &WayPoint, b: &WayPoint) -> f64 {
    Geodesic.distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    )
}

/// Sum of geodesic distances between consecutive points, in meters.
/// Zero for fewer than two points.
pub fn path_length_m(points: &[WayPoint]) -> f64 {
    points.windows(2).map(|w| distance_m(&w[0], &w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_symmetry() {
        let a = WayPoint::new(48.137, 11.575);
        let b = WayPoint::new(52.520, 13.405);
        assert!((distance_m(&a, &b) - distance_m(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let a = WayPoint::new(-33.86, 151.21);
        assert_eq!(distance_m(&a, &a), 0.0);
    }

    #[test]
    fn test_three_point_track_length() {
        let points = vec![
            WayPoint::new(1.0, 1.0),
            WayPoint::new(2.0, 2.0),
            WayPoint::new(3.0, 3.0),
        ];
        // Known WGS-84 geodesic path length for this diagonal.
        assert!((path_length_m(&points) - 313_705.48).abs() < 0.1);
    }

    #[test]
    fn test_path_length_short_inputs() {
        assert_eq!(path_length_m(&[]), 0.0);
        assert_eq!(path_length_m(&[WayPoint::new(1.0, 1.0)]), 0.0);
    }
}
