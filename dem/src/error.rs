use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("DEM source unavailable: {0}")]
    Unavailable(String),

    #[error("DEM acquisition failed: {0}")]
    Acquisition(String),

    #[error("invalid GeoTIFF {0}: {1}")]
    InvalidGeoTiff(PathBuf, &'static str),

    #[error("unsupported coordinate system EPSG:{0}")]
    UnsupportedCrs(u16),

    #[error("DEM worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
