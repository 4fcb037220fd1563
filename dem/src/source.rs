use crate::{BoundingBox, DemError, DemTile};
use log::debug;
use std::{fs, io::Write, path::Path, time::Duration, time::Instant};
use tempfile::NamedTempFile;

pub const OPENTOPOGRAPHY_URL: &str = "https://portal.opentopography.org/API/globaldem";

/// Something that can produce a GeoTIFF covering a bounding box.
pub trait DemSource: Send + Sync {
    /// Writes a GeoTIFF covering `bbox` to `dest`.
    ///
    /// Implementations must not leave a partial file at `dest` on
    /// failure.
    fn fetch(&self, bbox: &BoundingBox, dest: &Path) -> Result<(), DemError>;
}

impl<T: DemSource + ?Sized> DemSource for std::sync::Arc<T> {
    fn fetch(&self, bbox: &BoundingBox, dest: &Path) -> Result<(), DemError> {
        (**self).fetch(bbox, dest)
    }
}

/// Global DEM resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemResolution {
    /// SRTM GL1, 1 arc-second (~30 m).
    #[default]
    Srtm30,
    /// SRTM GL3, 3 arc-second (~90 m).
    Srtm90,
}

impl DemResolution {
    pub fn dem_type(self) -> &'static str {
        match self {
            DemResolution::Srtm30 => "SRTMGL1",
            DemResolution::Srtm90 => "SRTMGL3",
        }
    }
}

/// OpenTopography's global DEM API.
pub struct OpenTopography {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
    resolution: DemResolution,
}

impl OpenTopography {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, DemError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: OPENTOPOGRAPHY_URL.to_owned(),
            api_key,
            resolution: DemResolution::default(),
        })
    }

    #[must_use]
    pub fn resolution(mut self, resolution: DemResolution) -> Self {
        self.resolution = resolution;
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn query(&self, bbox: &BoundingBox, api_key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("demtype", self.resolution.dem_type().to_owned()),
            ("south", bbox.south.to_string()),
            ("north", bbox.north.to_string()),
            ("west", bbox.west.to_string()),
            ("east", bbox.east.to_string()),
            ("outputFormat", "GTiff".to_owned()),
            ("API_Key", api_key.to_owned()),
        ]
    }
}

impl DemSource for OpenTopography {
    fn fetch(&self, bbox: &BoundingBox, dest: &Path) -> Result<(), DemError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            DemError::Unavailable("no OpenTopography API key configured".to_owned())
        })?;

        let now = Instant::now();
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query(bbox, api_key))
            .send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(DemError::Acquisition(format!(
                "HTTP {status}: {}",
                body.trim()
            )));
        }
        let bytes = response.bytes()?;
        commit(&bytes, dest)?;

        debug!(
            "fetched {} byte {} tile to {dest:?}, duration: {:?}",
            bytes.len(),
            self.resolution.dem_type(),
            now.elapsed()
        );
        Ok(())
    }
}

/// Moves a downloaded tile to `dest`, but only once it decodes.
///
/// The body is staged in a uniquely named sibling of `dest`. A
/// rejected body goes away with the temp file.
fn commit(bytes: &[u8], dest: &Path) -> Result<(), DemError> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    if let Err(e) = DemTile::from_geotiff(tmp.path()) {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(200)]);
        return Err(DemError::Acquisition(format!(
            "unreadable tile ({e}): {}",
            head.trim()
        )));
    }
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
