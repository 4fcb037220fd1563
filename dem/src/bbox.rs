use geo::geometry::Point;

/// Meters per degree of latitude, treated as constant.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// A lat/lon aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Returns the box reaching `radius_km` from `center` in each
    /// cardinal direction.
    ///
    /// Uses a local equirectangular approximation, which is plenty for
    /// the handful of kilometers we search.
    pub fn around(center: Point<f64>, radius_km: f64) -> Self {
        let radius_m = radius_km * 1000.0;
        let lat = center.y();
        let lon = center.x();
        let dlat = radius_m / METERS_PER_DEGREE_LAT;
        let dlon = radius_m / (METERS_PER_DEGREE_LAT * lat.to_radians().cos());
        Self {
            west: lon - dlon,
            south: (lat - dlat).max(-90.0),
            east: lon + dlon,
            north: (lat + dlat).min(90.0),
        }
    }
}
