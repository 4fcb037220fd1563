use crate::TerrainError;
use geo::{algorithm::HaversineDistance, geometry::Point};

use super::linspace;

/// Returns `steps + 1` points on the straight lat/lon line from `start`
/// to `end`, both inclusive.
///
/// Planar interpolation is fine for the few-kilometer paths we
/// profile; it is not a great circle.
pub fn interpolate(start: Point<f64>, end: Point<f64>, steps: usize) -> Vec<Point<f64>> {
    let n = steps + 1;
    linspace(start.x(), end.x(), n)
        .zip(linspace(start.y(), end.y(), n))
        .map(|(lon, lat)| Point::new(lon, lat))
        .collect()
}

/// Great-circle distance between two points in meters.
pub fn distance_m(a: Point<f64>, b: Point<f64>) -> f64 {
    a.haversine_distance(&b)
}

/// Rejects points that are not finite, WGS84 lat/lon degrees.
pub fn validate_point(point: Point<f64>) -> Result<Point<f64>, TerrainError> {
    let (lon, lat) = (point.x(), point.y());
    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
        Ok(point)
    } else {
        Err(TerrainError::InvalidCoord { lat, lon })
    }
}

/// Rejects heights that are not finite.
pub fn validate_height(meters: f64) -> Result<f64, TerrainError> {
    if meters.is_finite() {
        Ok(meters)
    } else {
        Err(TerrainError::InvalidHeight(meters))
    }
}

#[cfg(test)]
mod tests {
    use super::{distance_m, interpolate, validate_height, validate_point};
    use approx::assert_relative_eq;
    use geo::point;

    #[test]
    fn test_interpolate() {
        let start = point!(x: -50.0, y: -10.0);
        let end = point!(x: -49.0, y: -9.0);
        let points = interpolate(start, end, 4);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], start);
        assert_eq!(points[4], end);
        assert_relative_eq!(points[2].x(), -49.5);
        assert_relative_eq!(points[2].y(), -9.5);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = point!(x: -47.9292, y: -15.7801);
        let b = point!(x: -47.9101, y: -15.7942);
        assert_relative_eq!(distance_m(a, b), distance_m(b, a), epsilon = 1e-9);
        assert_relative_eq!(distance_m(a, a), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = distance_m(point!(x: 0.0, y: 0.0), point!(x: 0.0, y: 1.0));
        assert!((d - 111_195.0).abs() < 100.0, "{d}");
    }

    #[test]
    fn test_validate_point() {
        assert!(validate_point(point!(x: 180.0, y: -90.0)).is_ok());
        assert!(validate_point(point!(x: 0.0, y: 90.5)).is_err());
        assert!(validate_point(point!(x: -181.0, y: 0.0)).is_err());
        assert!(validate_point(point!(x: f64::NAN, y: 0.0)).is_err());
    }

    #[test]
    fn test_validate_height() {
        assert_eq!(validate_height(-3.5).unwrap(), -3.5);
        assert!(validate_height(f64::NAN).is_err());
        assert!(validate_height(f64::INFINITY).is_err());
    }
}
