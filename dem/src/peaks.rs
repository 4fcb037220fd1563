use crate::DemTile;
use rayon::prelude::*;

/// A cell at least as high as every valid cell around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub col: usize,
    pub row: usize,
    pub elevation_m: f32,
}

/// Finds every local maximum in `tile`.
///
/// A cell is a peak when its elevation is `>=` every valid cell in the
/// `window` x `window` square centered on it. The square is clipped at
/// the tile edges and nodata cells are neither peaks nor neighbors.
/// Plateaus therefore yield every cell on them.
///
/// Peaks are returned in row-major order.
pub fn local_maxima(tile: &DemTile, window: usize) -> Vec<Peak> {
    let (width, height) = tile.dimensions();
    let half = window / 2;

    (0..height)
        .into_par_iter()
        .map(|row| {
            let mut peaks = Vec::new();
            for col in 0..width {
                let Some(elevation_m) = tile.get(col, row) else {
                    continue;
                };
                let rows = row.saturating_sub(half)..=(row + half).min(height - 1);
                let is_peak = rows.into_iter().all(|r| {
                    let cols = col.saturating_sub(half)..=(col + half).min(width - 1);
                    cols.into_iter()
                        .all(|c| tile.get(c, r).map_or(true, |other| elevation_m >= other))
                });
                if is_peak {
                    peaks.push(Peak {
                        col,
                        row,
                        elevation_m,
                    });
                }
            }
            peaks
        })
        .collect::<Vec<Vec<Peak>>>()
        .into_iter()
        .flatten()
        .collect()
}
