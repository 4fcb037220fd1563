use dem::DemError;
use terrain::TerrainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid request: {0}")]
    Invalid(#[from] TerrainError),

    #[error("{0}")]
    Dem(#[from] DemError),

    #[error("search worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
