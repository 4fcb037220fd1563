//! Digital elevation model tiles.
//!
//! A [`DemCache`] keeps GeoTIFF tiles on disk keyed by center and
//! radius, fetching missing ones from a [`DemSource`] such as
//! [`OpenTopography`]. Tiles load into a [`DemTile`] grid which
//! [`local_maxima`] scans for peaks.
//!
//! # References
//!
//! 1. [OGC GeoTIFF standard](https://docs.ogc.org/is/19-008r4/19-008r4.html)
//! 1. [OpenTopography global DEM API](https://portal.opentopography.org/apidocs/#/Public/getGlobalDem)

mod bbox;
mod cache;
mod crs;
mod error;
mod geotiff;
mod peaks;
mod source;
mod tile;

pub use crate::{
    bbox::{BoundingBox, METERS_PER_DEGREE_LAT},
    cache::{cache_file_name, DemCache},
    crs::Crs,
    error::DemError,
    peaks::{local_maxima, Peak},
    source::{DemResolution, DemSource, OpenTopography, OPENTOPOGRAPHY_URL},
    tile::{DemTile, GeoTransform},
};
