use crate::CoverageError;
use geo::geometry::Point;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

/// Geographic extent of a coverage raster, in degrees.
///
/// Producers are not careful about ordering, so `south > north` or
/// `west > east` may occur. Call [`Bounds::normalized`] before doing
/// math with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Returns these bounds with `south <= north` and `west <= east`.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            south: self.south.min(self.north),
            west: self.west.min(self.east),
            north: self.south.max(self.north),
            east: self.west.max(self.east),
        }
    }

    /// Zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.north == self.south || self.east == self.west
    }

    /// Smallest bounds containing both.
    #[must_use]
    pub fn union(&self, other: &Bounds) -> Self {
        let (a, b) = (self.normalized(), other.normalized());
        Self {
            south: a.south.min(b.south),
            west: a.west.min(b.west),
            north: a.north.max(b.north),
            east: a.east.max(b.east),
        }
    }

    pub fn center(&self) -> Point<f64> {
        Point::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }

    pub fn south_west(&self) -> Point<f64> {
        Point::new(self.west, self.south)
    }

    pub fn north_east(&self) -> Point<f64> {
        Point::new(self.east, self.north)
    }
}

/// A coverage raster and where it sits on the map.
///
/// Pixels with enough alpha are covered, everything else is not.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub image: PathBuf,
    pub bounds: Bounds,
}

impl Overlay {
    pub fn new<P: Into<PathBuf>>(image: P, bounds: Bounds) -> Self {
        Self {
            image: image.into(),
            bounds,
        }
    }

    /// Builds an overlay for `image` whose bounds live next to it in
    /// `<stem>.json`.
    pub fn from_companion<P: AsRef<Path>>(image: P) -> Result<Self, CoverageError> {
        let image = image.as_ref();
        if image.file_stem().is_none() {
            return Err(CoverageError::NoStem(image.to_owned()));
        }
        let companion = image.with_extension("json");
        let bounds = serde_json::from_reader(BufReader::new(File::open(companion)?))?;
        Ok(Self::new(image, bounds))
    }
}

/// Maps `point` to the pixel containing it in a `width` x `height`
/// raster spanning `bounds`.
///
/// Row 0 is the northern edge. Returns `None` for points outside the
/// raster and for degenerate bounds.
pub fn pixel_for(point: Point<f64>, bounds: &Bounds, width: u32, height: u32) -> Option<(u32, u32)> {
    let b = bounds.normalized();
    if b.is_degenerate() {
        return None;
    }
    let x = (((point.x() - b.west) / (b.east - b.west)) * f64::from(width)).floor();
    let y = (((b.north - point.y()) / (b.north - b.south)) * f64::from(height)).floor();
    if !(0.0..f64::from(width)).contains(&x) || !(0.0..f64::from(height)).contains(&y) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some((x as u32, y as u32))
}
