use crate::{BoundingBox, DemError, DemSource, DemTile};
use geo::geometry::Point;
use log::{debug, warn};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

/// Returns the cache file name for a DEM around `center`.
///
/// Every non-alphanumeric character of
/// `dem_{lat:.5}_{lon:.5}_{radius:.3}km` becomes `_`, so the name is
/// safe on any filesystem.
pub fn cache_file_name(center: Point<f64>, radius_km: f64) -> String {
    let raw = format!("dem_{:.5}_{:.5}_{:.3}km", center.y(), center.x(), radius_km);
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    name.push_str(".tif");
    name
}

/// DEM tiles on disk, acquired from `S` on a miss.
///
/// Tiles are never evicted.
pub struct DemCache<S> {
    dir: PathBuf,
    source: Arc<S>,
}

impl<S> Clone for DemCache<S> {
    fn clone(&self) -> Self {
        Self {
            dir: self.dir.clone(),
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: DemSource + 'static> DemCache<S> {
    pub fn new<P: AsRef<Path>>(dir: P, source: S) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
            source: Arc::new(source),
        }
    }

    pub fn path_for(&self, center: Point<f64>, radius_km: f64) -> PathBuf {
        self.dir.join(cache_file_name(center, radius_km))
    }

    /// Loads the DEM around `center`, fetching it first if it is not
    /// cached.
    ///
    /// A cached file that no longer decodes is deleted and fetched
    /// again. A freshly fetched file that does not decode is deleted
    /// before the error is returned, so the next call retries.
    ///
    /// Blocks on network and disk IO.
    pub fn load_blocking(&self, center: Point<f64>, radius_km: f64) -> Result<DemTile, DemError> {
        let path = self.path_for(center, radius_km);
        if path.exists() {
            match read(&path) {
                Ok(tile) => return Ok(tile),
                Err(e) => {
                    warn!("discarding unreadable DEM {path:?}: {e}");
                    discard(&path)?;
                }
            }
        }

        let bbox = BoundingBox::around(center, radius_km);
        debug!("DEM cache miss, fetching {bbox:?} to {path:?}");
        fs::create_dir_all(&self.dir)?;
        self.source.fetch(&bbox, &path)?;
        read(&path).map_err(|e| {
            if let Err(io) = discard(&path) {
                warn!("failed to remove unreadable DEM {path:?}: {io}");
            }
            e
        })
    }

    /// Async wrapper around [`DemCache::load_blocking`] which runs it
    /// on tokio's blocking pool.
    pub async fn get_dem(&self, center: Point<f64>, radius_km: f64) -> Result<DemTile, DemError> {
        let cache = self.clone();
        tokio::task::spawn_blocking(move || cache.load_blocking(center, radius_km)).await?
    }
}

fn read(path: &Path) -> Result<DemTile, DemError> {
    let now = Instant::now();
    let tile = DemTile::from_geotiff(path)?;
    debug!(
        "loaded {:?} DEM {path:?}, range: {:?}, duration: {:?}",
        tile.dimensions(),
        tile.min_max(),
        now.elapsed()
    );
    Ok(tile)
}

/// Removes `path`, tolerating a concurrent removal.
fn discard(path: &Path) -> Result<(), DemError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
