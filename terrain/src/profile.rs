use crate::{
    math::{interpolate, linspace, validate_height, validate_point},
    ElevationService, TerrainError,
};
use geo::geometry::Point;
use log::debug;
use serde::{Deserialize, Serialize};

/// Number of steps between the two ends of a profile.
pub const DEFAULT_STEPS: usize = 50;

/// Safety margin added on top of a blockage's deficit when sizing a
/// taller tower.
pub const ADDITIONAL_HEIGHT_MARGIN_M: f64 = 3.0;

/// One terrain sample along a profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationSample {
    pub lat: f64,
    pub lon: f64,

    /// Ground elevation (meters).
    pub elevation_m: f64,

    /// Position along the path, `0.0` at start and `1.0` at end.
    pub fraction: f64,
}

impl ElevationSample {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// The worst terrain obstruction along a profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blockage {
    pub lat: f64,
    pub lon: f64,

    /// Ground elevation at the obstruction (meters).
    pub elevation_m: f64,

    /// How far the terrain rises above the sight line (meters, > 0).
    pub deficit_m: f64,

    /// Position along the path, `0.0` at start and `1.0` at end.
    pub fraction: f64,
}

impl Blockage {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Extra mast height needed to clear this obstruction.
    pub fn additional_height_m(&self) -> f64 {
        self.deficit_m + ADDITIONAL_HEIGHT_MARGIN_M
    }
}

/// Line-of-sight verdict for a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Los {
    Clear,
    Blocked(Blockage),
}

/// A terrain profile and straight line of sight between two elevated
/// points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// `steps + 1` samples from start to end, both inclusive.
    pub samples: Vec<ElevationSample>,

    /// The interior sample rising furthest above the sight line, if
    /// any rises above it at all.
    pub blockage: Option<Blockage>,

    /// The sample with the highest terrain.
    pub highest: ElevationSample,

    /// Terrain plus installed height at the start (meters).
    pub start_total_m: f64,

    /// Terrain plus installed height at the end (meters).
    pub end_total_m: f64,
}

impl Profile {
    pub fn builder() -> ProfileBuilder {
        ProfileBuilder {
            start: None,
            end: None,
            start_alt_m: 0.0,
            end_alt_m: 0.0,
            steps: DEFAULT_STEPS,
        }
    }

    pub fn los(&self) -> Los {
        match self.blockage {
            None => Los::Clear,
            Some(blockage) => Los::Blocked(blockage),
        }
    }

    pub fn has_los(&self) -> bool {
        self.blockage.is_none()
    }

    /// Elevation of the straight sight line at each sample (meters).
    pub fn sight_line_m(&self) -> Vec<f64> {
        linspace(self.start_total_m, self.end_total_m, self.samples.len()).collect()
    }
}

pub struct ProfileBuilder {
    /// Start point of the path (required).
    start: Option<Point<f64>>,

    /// End point of the path (required).
    end: Option<Point<f64>>,

    /// Installed height above ground at start (meters, defaults to 0).
    start_alt_m: f64,

    /// Installed height above ground at end (meters, defaults to 0).
    end_alt_m: f64,

    /// Number of steps between start and end (defaults to 50).
    steps: usize,
}

impl ProfileBuilder {
    /// Start point of the path (required).
    #[must_use]
    pub fn start(mut self, point: Point<f64>) -> Self {
        self.start = Some(point);
        self
    }

    /// Installed height above ground at start (meters, defaults to 0).
    #[must_use]
    pub fn start_alt(mut self, meters: f64) -> Self {
        self.start_alt_m = meters;
        self
    }

    /// End point of the path (required).
    #[must_use]
    pub fn end(mut self, point: Point<f64>) -> Self {
        self.end = Some(point);
        self
    }

    /// Installed height above ground at end (meters, defaults to 0).
    #[must_use]
    pub fn end_alt(mut self, meters: f64) -> Self {
        self.end_alt_m = meters;
        self
    }

    /// Number of steps between start and end (defaults to 50).
    #[must_use]
    pub fn steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn build<E>(&self, elevation: &E) -> Result<Profile, TerrainError>
    where
        E: ElevationService + ?Sized,
    {
        let start = validate_point(self.start.ok_or(TerrainError::Builder("start"))?)?;
        let end = validate_point(self.end.ok_or(TerrainError::Builder("end"))?)?;
        validate_height(self.start_alt_m)?;
        validate_height(self.end_alt_m)?;
        if self.steps == 0 {
            return Err(TerrainError::Steps);
        }

        let path = interpolate(start, end, self.steps);

        let (terrain, terrain_runtime) = {
            let now = std::time::Instant::now();
            let terrain = checked_terrain(&path, elevation.elevations(&path)?)?;
            (terrain, now.elapsed())
        };

        let fractions: Vec<f64> = linspace(0.0, 1.0, path.len()).collect();
        let samples: Vec<ElevationSample> = path
            .iter()
            .zip(terrain.iter())
            .zip(fractions.iter())
            .map(|((point, &elevation_m), &fraction)| ElevationSample {
                lat: point.y(),
                lon: point.x(),
                elevation_m,
                fraction,
            })
            .collect();

        // Path always has at least two points since steps > 0.
        let start_total_m = samples[0].elevation_m + self.start_alt_m;
        let end_total_m = samples[samples.len() - 1].elevation_m + self.end_alt_m;
        let sight_line: Vec<f64> = linspace(start_total_m, end_total_m, samples.len()).collect();

        let blockage = worst_blockage(&samples, &sight_line);
        let highest = highest_sample(&samples);

        debug!(
            "profile; len: {}, terrain_exec: {:?}, blocked: {}",
            samples.len(),
            terrain_runtime,
            blockage.is_some()
        );

        Ok(Profile {
            samples,
            blockage,
            highest,
            start_total_m,
            end_total_m,
        })
    }
}

/// Unwraps the service response, failing on any gap.
fn checked_terrain(
    path: &[Point<f64>],
    elevations: Vec<Option<f64>>,
) -> Result<Vec<f64>, TerrainError> {
    if elevations.is_empty() {
        return Err(TerrainError::EmptyResponse);
    }
    if elevations.len() != path.len() {
        return Err(TerrainError::LengthMismatch {
            expected: path.len(),
            got: elevations.len(),
        });
    }
    elevations
        .into_iter()
        .zip(path)
        .enumerate()
        .map(|(index, (elevation, point))| {
            elevation.ok_or(TerrainError::NullElevation {
                index,
                lat: point.y(),
                lon: point.x(),
            })
        })
        .collect()
}

/// Returns the interior sample rising furthest above the sight line.
///
/// Terrain exactly on the line does not block.
fn worst_blockage(samples: &[ElevationSample], sight_line: &[f64]) -> Option<Blockage> {
    let interior = 1..samples.len().saturating_sub(1);
    let mut worst: Option<Blockage> = None;
    for idx in interior {
        let sample = &samples[idx];
        let deficit_m = sample.elevation_m - sight_line[idx];
        if deficit_m > 0.0 && worst.map_or(true, |w| deficit_m > w.deficit_m) {
            worst = Some(Blockage {
                lat: sample.lat,
                lon: sample.lon,
                elevation_m: sample.elevation_m,
                deficit_m,
                fraction: sample.fraction,
            });
        }
    }
    worst
}

fn highest_sample(samples: &[ElevationSample]) -> ElevationSample {
    let mut highest = samples[0];
    for sample in &samples[1..] {
        if sample.elevation_m > highest.elevation_m {
            highest = *sample;
        }
    }
    highest
}

#[cfg(test)]
mod tests {
    use super::{Los, Profile};
    use crate::{ElevationService, TerrainError};
    use approx::assert_relative_eq;
    use geo::{point, Point};

    /// Serves a canned terrain profile.
    struct Canned(Vec<Option<f64>>);

    impl ElevationService for Canned {
        fn elevations(&self, points: &[Point<f64>]) -> Result<Vec<Option<f64>>, TerrainError> {
            assert_eq!(points.len(), self.0.len());
            Ok(self.0.clone())
        }
    }

    fn flat_with_peak(len: usize, peak_idx: usize, peak: f64) -> Canned {
        let mut terrain = vec![Some(100.0); len];
        terrain[peak_idx] = Some(peak);
        Canned(terrain)
    }

    fn build(terrain: &Canned, steps: usize, start_alt: f64, end_alt: f64) -> Profile {
        Profile::builder()
            .start(point!(x: -49.5, y: -9.5))
            .start_alt(start_alt)
            .end(point!(x: -49.49, y: -9.49))
            .end_alt(end_alt)
            .steps(steps)
            .build(terrain)
            .unwrap()
    }

    #[test]
    fn test_midpoint_peak_blocks() {
        // Sight line sits at 110 m everywhere; the 150 m hill at the
        // midpoint clears it by 40 m.
        let terrain = flat_with_peak(51, 25, 150.0);
        let profile = build(&terrain, 50, 10.0, 10.0);
        assert_eq!(profile.samples.len(), 51);
        let blockage = profile.blockage.unwrap();
        assert_relative_eq!(blockage.deficit_m, 150.0 - 110.0);
        assert_relative_eq!(blockage.fraction, 0.5);
        assert_relative_eq!(blockage.additional_height_m(), 43.0);
        assert_eq!(profile.highest.elevation_m, 150.0);
        assert!(matches!(profile.los(), Los::Blocked(_)));
    }

    #[test]
    fn test_sloped_sight_line() {
        // Start total 100 + 0, end total 100 + 40 -> line at 120 m
        // halfway along.
        let terrain = flat_with_peak(11, 5, 150.0);
        let profile = build(&terrain, 10, 0.0, 40.0);
        let sight_line = profile.sight_line_m();
        assert_relative_eq!(sight_line[5], 120.0);
        assert_relative_eq!(profile.blockage.unwrap().deficit_m, 30.0);
    }

    #[test]
    fn test_touching_terrain_is_clear() {
        let terrain = flat_with_peak(11, 5, 110.0);
        let profile = build(&terrain, 10, 10.0, 10.0);
        assert!(profile.blockage.is_none());
        assert!(profile.has_los());
        assert_eq!(profile.los(), Los::Clear);
    }

    #[test]
    fn test_worst_of_several_obstructions() {
        let mut terrain = vec![Some(100.0); 11];
        terrain[2] = Some(115.0);
        terrain[7] = Some(125.0);
        terrain[8] = Some(112.0);
        let profile = build(&Canned(terrain), 10, 10.0, 10.0);
        let blockage = profile.blockage.unwrap();
        assert_relative_eq!(blockage.deficit_m, 15.0);
        assert_relative_eq!(blockage.fraction, 0.7);
    }

    #[test]
    fn test_endpoints_never_block() {
        let mut terrain = vec![Some(100.0); 11];
        terrain[0] = Some(300.0);
        let profile = build(&Canned(terrain), 10, 0.0, 0.0);
        // Sight line falls from 300 to 100 so every interior sample is
        // below it.
        assert!(profile.blockage.is_none());
        assert_eq!(profile.highest.elevation_m, 300.0);
        assert_eq!(profile.highest.fraction, 0.0);
    }

    #[test]
    fn test_null_elevation_fails() {
        let mut terrain = vec![Some(100.0); 11];
        terrain[3] = None;
        let err = Profile::builder()
            .start(point!(x: -49.5, y: -9.5))
            .end(point!(x: -49.49, y: -9.49))
            .steps(10)
            .build(&Canned(terrain))
            .unwrap_err();
        assert!(matches!(err, TerrainError::NullElevation { index: 3, .. }));
    }

    #[test]
    fn test_empty_response_fails() {
        struct Empty;
        impl ElevationService for Empty {
            fn elevations(&self, _: &[Point<f64>]) -> Result<Vec<Option<f64>>, TerrainError> {
                Ok(Vec::new())
            }
        }
        let err = Profile::builder()
            .start(point!(x: -49.5, y: -9.5))
            .end(point!(x: -49.49, y: -9.49))
            .build(&Empty)
            .unwrap_err();
        assert!(matches!(err, TerrainError::EmptyResponse));
    }

    #[test]
    fn test_missing_endpoint() {
        let err = Profile::builder()
            .start(point!(x: -49.5, y: -9.5))
            .build(&Canned(vec![]))
            .unwrap_err();
        assert!(matches!(err, TerrainError::Builder("end")));
    }

    #[test]
    fn test_zero_steps() {
        let err = Profile::builder()
            .start(point!(x: -49.5, y: -9.5))
            .end(point!(x: -49.49, y: -9.49))
            .steps(0)
            .build(&Canned(vec![]))
            .unwrap_err();
        assert!(matches!(err, TerrainError::Steps));
    }

    #[test]
    fn test_non_finite_height() {
        let err = Profile::builder()
            .start(point!(x: -49.5, y: -9.5))
            .start_alt(f64::INFINITY)
            .end(point!(x: -49.49, y: -9.49))
            .build(&Canned(vec![]))
            .unwrap_err();
        assert!(matches!(err, TerrainError::InvalidHeight(_)));
    }
}
