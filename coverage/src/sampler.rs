use crate::{pixel_for, Bounds, CoverageError, Overlay};
use geo::geometry::Point;
use image::RgbaImage;
use log::{debug, warn};
use serde::Serialize;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Instant,
};

/// Pixels with alpha above this are covered.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 50;

/// Returns true if `point` lands on a pixel of `image` whose alpha is
/// strictly greater than `threshold`.
pub fn is_covered(point: Point<f64>, bounds: &Bounds, image: &RgbaImage, threshold: u8) -> bool {
    let (width, height) = image.dimensions();
    pixel_for(point, bounds, width, height)
        .map_or(false, |(x, y)| image.get_pixel(x, y).0[3] > threshold)
}

fn load(path: &Path) -> Result<RgbaImage, CoverageError> {
    let now = Instant::now();
    let image = image::open(path)?.to_rgba8();
    debug!(
        "decoded {:?} overlay {path:?}, duration: {:?}",
        image.dimensions(),
        now.elapsed()
    );
    Ok(image)
}

/// Samples coverage overlays, decoding each image at most once.
///
/// An overlay whose image is missing or cannot be decoded is logged the
/// first time it is needed and never covers anything afterwards.
/// Decoded images are held until the sampler is dropped or
/// [`Sampler::release`]d.
pub struct Sampler {
    threshold: u8,
    images: HashMap<PathBuf, Option<RgbaImage>>,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA_THRESHOLD)
    }
}

impl Sampler {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            images: HashMap::new(),
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    fn image(&mut self, path: &Path) -> Option<&RgbaImage> {
        self.images
            .entry(path.to_owned())
            .or_insert_with(|| match load(path) {
                Ok(image) => Some(image),
                Err(CoverageError::Image(image::ImageError::IoError(e)))
                    if e.kind() == std::io::ErrorKind::NotFound =>
                {
                    warn!("coverage overlay {path:?} is missing, skipping");
                    None
                }
                Err(e) => {
                    warn!("coverage overlay {path:?} is unreadable, skipping: {e}");
                    None
                }
            })
            .as_ref()
    }

    /// Returns true if `overlay` covers `point`.
    pub fn covers(&mut self, point: Point<f64>, overlay: &Overlay) -> bool {
        let threshold = self.threshold;
        self.image(&overlay.image)
            .map_or(false, |image| is_covered(point, &overlay.bounds, image, threshold))
    }

    /// Returns true if any of `overlays` covers `point`.
    pub fn covers_any(&mut self, point: Point<f64>, overlays: &[Overlay]) -> bool {
        overlays.iter().any(|overlay| self.covers(point, overlay))
    }

    /// Drops every decoded image.
    pub fn release(&mut self) {
        self.images.clear();
    }

    /// Number of images decoded (or found unusable) so far.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Anything with a geographic position.
pub trait Located {
    fn location(&self) -> Point<f64>;
}

impl Located for Point<f64> {
    fn location(&self) -> Point<f64> {
        *self
    }
}

/// A target annotated with its coverage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verified<T> {
    #[serde(flatten)]
    pub target: T,
    pub outside_coverage: bool,
}

/// Checks every target against every overlay.
///
/// A target is outside coverage when no overlay covers it. Each
/// overlay image is decoded once for the whole batch.
pub fn verify_many<T, I>(targets: I, overlays: &[Overlay], threshold: u8) -> Vec<Verified<T>>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    let now = Instant::now();
    let mut sampler = Sampler::new(threshold);
    let verified: Vec<Verified<T>> = targets
        .into_iter()
        .map(|target| {
            let outside_coverage = !sampler.covers_any(target.location(), overlays);
            Verified {
                target,
                outside_coverage,
            }
        })
        .collect();
    debug!(
        "verified {} targets against {} overlays, duration: {:?}",
        verified.len(),
        overlays.len(),
        now.elapsed()
    );
    verified
}
