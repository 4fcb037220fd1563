use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("overlay {0:?} has no file stem")]
    NoStem(PathBuf),
}
