//! # Repeater Site Search
//!
//! `repeater` looks for high ground inside existing coverage that can
//! see an uncovered target.

mod error;
mod search;
mod site;

pub use {
    crate::{
        error::SearchError,
        search::{
            dem_extent, SearchRequest, SiteSearch, Throttle, MAX_DISTANCE_M, MAX_RESULTS,
            PEAK_WINDOW, RADIUS_BUFFER_KM,
        },
        site::{rank, CandidateSite, LosStatus},
    },
    coverage, dem, geo, terrain,
};
