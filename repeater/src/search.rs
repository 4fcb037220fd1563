use crate::{rank, CandidateSite, LosStatus, SearchError};
use coverage::{Bounds, Overlay, Sampler, DEFAULT_ALPHA_THRESHOLD};
use dem::{local_maxima, DemCache, DemSource, DemTile};
use geo::{
    geometry::{Point, Polygon},
    Contains, HaversineDistance,
};
use log::{debug, warn};
use std::{sync::Arc, time::Duration, time::Instant};
use terrain::{
    math::{validate_height, validate_point},
    ElevationService, ProfileCache, ProfileStore,
};

/// Candidates farther than this from the target are dropped.
pub const MAX_DISTANCE_M: f64 = 1800.0;

/// At most this many candidates are returned.
pub const MAX_RESULTS: usize = 25;

/// Side of the square a peak must dominate (cells).
pub const PEAK_WINDOW: usize = 5;

/// Added to the overlay-derived DEM radius.
pub const RADIUS_BUFFER_KM: f64 = 0.5;

/// Pacing for line-of-sight lookups.
///
/// After every `every` evaluated candidates the search sleeps for
/// `pause`. `every == 0` never sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub every: usize,
    pub pause: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            every: 10,
            pause: Duration::from_millis(50),
        }
    }
}

impl Throttle {
    pub fn none() -> Self {
        Self {
            every: 0,
            pause: Duration::ZERO,
        }
    }

    fn should_pause(&self, evaluated: usize) -> bool {
        self.every != 0 && evaluated % self.every == 0
    }
}

/// Where to look for repeater sites, and for whom.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// The asset that needs coverage.
    pub target: Point<f64>,

    /// Repeater antenna height above ground (meters).
    pub antenna_height_m: f64,

    /// Target receiver height above ground (meters).
    pub receiver_height_m: f64,

    /// Existing coverage; candidates must sit inside it.
    pub overlays: Vec<Overlay>,

    /// Areas where a repeater may not go.
    pub excluded: Vec<Polygon<f64>>,
}

/// A peak that passed the geometric filters.
struct Qualified {
    point: Point<f64>,
    elevation_m: f64,
    distance_m: f64,
}

/// Finds DEM peaks that could relay coverage to an uncovered target.
pub struct SiteSearch<S, P, E> {
    dem: DemCache<S>,
    profiles: Arc<ProfileCache<P, E>>,
    throttle: Throttle,
    alpha_threshold: u8,
}

impl<S, P, E> SiteSearch<S, P, E>
where
    S: DemSource + 'static,
    P: ProfileStore + 'static,
    E: ElevationService + 'static,
{
    pub fn new(dem: DemCache<S>, profiles: Arc<ProfileCache<P, E>>) -> Self {
        Self {
            dem,
            profiles,
            throttle: Throttle::default(),
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
        }
    }

    #[must_use]
    pub fn throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    #[must_use]
    pub fn alpha_threshold(mut self, threshold: u8) -> Self {
        self.alpha_threshold = threshold;
        self
    }

    /// Returns up to [`MAX_RESULTS`] candidate sites, best first.
    ///
    /// Only an invalid request or a DEM failure fails the search. A
    /// candidate whose line of sight cannot be computed is kept with
    /// [`LosStatus::Failed`].
    pub async fn find_candidate_sites(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<CandidateSite>, SearchError> {
        validate_point(request.target)?;
        validate_height(request.antenna_height_m)?;
        validate_height(request.receiver_height_m)?;

        let Some(bounds) = request
            .overlays
            .iter()
            .map(|overlay| overlay.bounds.normalized())
            .reduce(|a, b| a.union(&b))
        else {
            return Ok(Vec::new());
        };

        let now = Instant::now();
        let (center, radius_km) = dem_extent(&bounds);
        let tile = self.dem.get_dem(center, radius_km).await?;

        let candidates = {
            let request = request.clone();
            let threshold = self.alpha_threshold;
            tokio::task::spawn_blocking(move || qualify(&tile, &request, threshold)).await?
        };
        debug!(
            "{} qualified candidates within {radius_km:.3} km of {center:?}",
            candidates.len()
        );

        let mut sites = Vec::with_capacity(candidates.len());
        for (i, candidate) in candidates.into_iter().enumerate() {
            let los = self.line_of_sight(&candidate, request).await?;
            sites.push(CandidateSite {
                lat: candidate.point.y(),
                lon: candidate.point.x(),
                elevation_m: candidate.elevation_m,
                distance_m: candidate.distance_m,
                los,
            });
            if self.throttle.should_pause(i + 1) {
                tokio::time::sleep(self.throttle.pause).await;
            }
        }

        rank(&mut sites);
        sites.truncate(MAX_RESULTS);
        debug!(
            "found {} candidate sites, duration: {:?}",
            sites.len(),
            now.elapsed()
        );
        Ok(sites)
    }

    async fn line_of_sight(
        &self,
        candidate: &Qualified,
        request: &SearchRequest,
    ) -> Result<LosStatus, SearchError> {
        let profiles = Arc::clone(&self.profiles);
        let (site, target) = (candidate.point, request.target);
        let (antenna_m, receiver_m) = (request.antenna_height_m, request.receiver_height_m);
        let result = tokio::task::spawn_blocking(move || {
            profiles.get_or_compute(site, target, antenna_m, receiver_m)
        })
        .await?;
        Ok(match result {
            Ok(profile) => profile.los().into(),
            Err(e) => {
                warn!("line of sight from {site:?} failed: {e}");
                LosStatus::Failed {
                    reason: e.to_string(),
                }
            }
        })
    }
}

/// Center and radius of the DEM needed to cover `bounds`.
pub fn dem_extent(bounds: &Bounds) -> (Point<f64>, f64) {
    let diagonal_m = bounds.south_west().haversine_distance(&bounds.north_east());
    (bounds.center(), diagonal_m / 2.0 / 1000.0 + RADIUS_BUFFER_KM)
}

/// Applies the coverage, distance and exclusion filters to every peak
/// in `tile`, preserving discovery order.
fn qualify(tile: &DemTile, request: &SearchRequest, threshold: u8) -> Vec<Qualified> {
    let now = Instant::now();
    let peaks = local_maxima(tile, PEAK_WINDOW);
    let mut sampler = Sampler::new(threshold);
    let qualified: Vec<Qualified> = peaks
        .iter()
        .filter_map(|peak| {
            let point = tile.cell_center(peak.col, peak.row);
            if !sampler.covers_any(point, &request.overlays) {
                return None;
            }
            let distance_m = point.haversine_distance(&request.target);
            if distance_m > MAX_DISTANCE_M {
                return None;
            }
            if request.excluded.iter().any(|area| area.contains(&point)) {
                return None;
            }
            Some(Qualified {
                point,
                elevation_m: f64::from(peak.elevation_m),
                distance_m,
            })
        })
        .collect();
    debug!(
        "{} of {} peaks qualified, duration: {:?}",
        qualified.len(),
        peaks.len(),
        now.elapsed()
    );
    qualified
}

#[cfg(test)]
mod tests {
    use super::{dem_extent, Throttle, RADIUS_BUFFER_KM};
    use coverage::Bounds;

    #[test]
    fn test_dem_extent() {
        let bounds = Bounds::new(-10.0, -50.0, -9.0, -49.0);
        let (center, radius_km) = dem_extent(&bounds);
        assert_eq!((center.x(), center.y()), (-49.5, -9.5));
        // Half of a ~156 km diagonal.
        assert!((radius_km - RADIUS_BUFFER_KM - 78.0).abs() < 1.0);
    }

    #[test]
    fn test_throttle() {
        let throttle = Throttle::default();
        assert!(!throttle.should_pause(9));
        assert!(throttle.should_pause(10));
        assert!(!Throttle::none().should_pause(10));
    }
}
