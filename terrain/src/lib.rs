//! Terrain profiles and line of sight between two elevated points.

mod cache;
mod elevation;
mod error;
pub mod math;
mod profile;

pub use crate::{
    cache::{DiskStore, MemStore, ProfileCache, ProfileKey, ProfileStore},
    elevation::{ElevationService, Interpolation, OpenTopoData, DEFAULT_BASE_URL, DEFAULT_DATASET},
    error::TerrainError,
    profile::{
        Blockage, ElevationSample, Los, Profile, ProfileBuilder, ADDITIONAL_HEIGHT_MARGIN_M,
        DEFAULT_STEPS,
    },
};
pub use geo;
