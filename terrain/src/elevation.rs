//! Terrain elevation lookups.

use crate::TerrainError;
use geo::geometry::Point;
use log::debug;
use serde::Deserialize;
use std::time::Duration;

/// A source of terrain elevation for arbitrary points.
pub trait ElevationService: Send + Sync {
    /// Returns one elevation (meters) per input point, in the same
    /// order.
    ///
    /// `None` marks a point the service has no data for. Callers
    /// decide whether that is fatal.
    fn elevations(&self, points: &[Point<f64>]) -> Result<Vec<Option<f64>>, TerrainError>;
}

impl<T: ElevationService + ?Sized> ElevationService for std::sync::Arc<T> {
    fn elevations(&self, points: &[Point<f64>]) -> Result<Vec<Option<f64>>, TerrainError> {
        (**self).elevations(points)
    }
}

/// Default dataset for [OpenTopoData].
pub const DEFAULT_DATASET: &str = "srtm30m";

/// Default base URL for [OpenTopoData].
pub const DEFAULT_BASE_URL: &str = "https://api.opentopodata.org";

/// How the service interpolates between raster cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    Bilinear,
    #[default]
    Cubic,
}

impl Interpolation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Cubic => "cubic",
        }
    }
}

/// Client for an [Open Topo Data](https://www.opentopodata.org)
/// compatible elevation API.
///
/// All points of one call go out in a single request.
pub struct OpenTopoData {
    client: reqwest::blocking::Client,
    base_url: String,
    dataset: String,
    interpolation: Interpolation,
}

impl OpenTopoData {
    /// Returns a client whose every request gives up after `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        dataset: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TerrainError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            dataset: dataset.into(),
            interpolation: Interpolation::default(),
        })
    }

    #[must_use]
    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.dataset
        )
    }
}

impl ElevationService for OpenTopoData {
    fn elevations(&self, points: &[Point<f64>]) -> Result<Vec<Option<f64>>, TerrainError> {
        #[derive(Deserialize)]
        struct Response {
            status: String,
            #[serde(default)]
            error: Option<String>,
            #[serde(default)]
            results: Vec<Sample>,
        }

        #[derive(Deserialize)]
        struct Sample {
            elevation: Option<f64>,
        }

        let now = std::time::Instant::now();
        let response: Response = self
            .client
            .get(self.url())
            .query(&[
                ("locations", locations_param(points)),
                ("interpolation", self.interpolation.as_str().to_string()),
            ])
            .send()?
            .error_for_status()?
            .json()?;

        if response.status != "OK" {
            return Err(TerrainError::Upstream(
                response.error.unwrap_or(response.status),
            ));
        }

        debug!(
            "elevations; points: {}, exec: {:?}",
            points.len(),
            now.elapsed()
        );

        Ok(response
            .results
            .into_iter()
            .map(|sample| sample.elevation)
            .collect())
    }
}

/// Formats points as the `lat,lon|lat,lon|...` query parameter.
fn locations_param(points: &[Point<f64>]) -> String {
    points
        .iter()
        .map(|point| format!("{},{}", point.y(), point.x()))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::{locations_param, OpenTopoData};
    use geo::point;
    use std::time::Duration;

    #[test]
    fn test_locations_param() {
        let points = [point!(x: -49.5, y: -9.5), point!(x: 10.25, y: 45.0)];
        assert_eq!(locations_param(&points), "-9.5,-49.5|45,10.25");
    }

    #[test]
    fn test_url() {
        let client =
            OpenTopoData::new("http://localhost:5000/", "srtm90m", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url(), "http://localhost:5000/v1/srtm90m");
    }
}
