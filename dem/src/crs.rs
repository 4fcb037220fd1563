use std::f64::consts::PI;

/// WGS84 semi-major axis, used by web mercator.
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Coordinate system of a DEM's native grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Lat/lon degrees (EPSG:4326 and friends).
    Geographic(u16),

    /// Spherical web mercator meters (EPSG:3857).
    WebMercator,
}

impl Default for Crs {
    fn default() -> Self {
        Crs::Geographic(4326)
    }
}

impl Crs {
    /// Returns the CRS for a GeoTIFF EPSG code, if we can convert it
    /// to lat/lon.
    pub fn from_epsg(code: u16) -> Option<Self> {
        match code {
            4326 | 4269 | 4258 | 4979 => Some(Crs::Geographic(code)),
            3857 | 3785 => Some(Crs::WebMercator),
            _ => None,
        }
    }

    pub fn epsg(&self) -> u16 {
        match self {
            Crs::Geographic(code) => *code,
            Crs::WebMercator => 3857,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic(_))
    }

    /// Converts native `(x, y)` to `(lon, lat)` degrees.
    pub fn to_lon_lat(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Crs::Geographic(_) => (x, y),
            Crs::WebMercator => {
                let lon = (x / EARTH_RADIUS) * (180.0 / PI);
                let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0) * (180.0 / PI);
                (lon, lat)
            }
        }
    }

    /// Converts `(lon, lat)` degrees to native `(x, y)`.
    pub fn from_lon_lat(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Crs::Geographic(_) => (lon, lat),
            Crs::WebMercator => {
                let x = lon * (PI / 180.0) * EARTH_RADIUS;
                let y = ((lat * PI / 360.0 + PI / 4.0).tan()).ln() * EARTH_RADIUS;
                (x, y)
            }
        }
    }
}
