use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("invalid coordinate lat: {lat}, lon: {lon}")]
    InvalidCoord { lat: f64, lon: f64 },

    #[error("invalid height {0} m")]
    InvalidHeight(f64),

    #[error("profile needs at least one step")]
    Steps,

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("elevation service: {0}")]
    Upstream(String),

    #[error("elevation service returned no samples")]
    EmptyResponse,

    #[error("elevation service returned {got} samples, expected {expected}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("no elevation for sample {index} ({lat}, {lon})")]
    NullElevation { index: usize, lat: f64, lon: f64 },
}
