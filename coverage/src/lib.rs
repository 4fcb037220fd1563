//! Coverage rasters.
//!
//! An [`Overlay`] is an RGBA image stretched over geographic
//! [`Bounds`]. A point is covered by an overlay when the pixel under it
//! is opaque enough.

mod bounds;
mod error;
mod sampler;

pub use crate::{
    bounds::{pixel_for, Bounds, Overlay},
    error::CoverageError,
    sampler::{is_covered, verify_many, Located, Sampler, Verified, DEFAULT_ALPHA_THRESHOLD},
};
pub use image::RgbaImage;
