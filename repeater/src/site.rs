use geo::geometry::Point;
use serde::Serialize;
use std::cmp::Ordering;
use terrain::{Blockage, Los};

/// Outcome of checking a candidate's line of sight to the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LosStatus {
    Clear,
    Blocked {
        blockage: Blockage,
        /// Extra tower height needed to clear `blockage`.
        additional_height_m: f64,
    },
    /// The profile could not be computed.
    Failed { reason: String },
}

impl From<Los> for LosStatus {
    fn from(los: Los) -> Self {
        match los {
            Los::Clear => LosStatus::Clear,
            Los::Blocked(blockage) => LosStatus::Blocked {
                additional_height_m: blockage.additional_height_m(),
                blockage,
            },
        }
    }
}

/// A DEM peak worth considering for a repeater.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSite {
    pub lat: f64,
    pub lon: f64,
    pub elevation_m: f64,
    /// Great-circle distance to the target.
    pub distance_m: f64,
    pub los: LosStatus,
}

impl CandidateSite {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    pub fn has_los(&self) -> bool {
        matches!(self.los, LosStatus::Clear)
    }

    pub fn blockage(&self) -> Option<&Blockage> {
        match &self.los {
            LosStatus::Blocked { blockage, .. } => Some(blockage),
            _ => None,
        }
    }

    pub fn additional_height_m(&self) -> Option<f64> {
        match self.los {
            LosStatus::Blocked {
                additional_height_m,
                ..
            } => Some(additional_height_m),
            _ => None,
        }
    }
}

/// Sorts sites best first: clear line of sight, then higher, then
/// closer.
///
/// The sort is stable, so fully tied sites keep discovery order.
pub fn rank(sites: &mut [CandidateSite]) {
    sites.sort_by(|a, b| {
        b.has_los()
            .cmp(&a.has_los())
            .then_with(|| b.elevation_m.partial_cmp(&a.elevation_m).unwrap_or(Ordering::Equal))
            .then_with(|| a.distance_m.partial_cmp(&b.distance_m).unwrap_or(Ordering::Equal))
    });
}
