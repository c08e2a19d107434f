//! Error types for boundary synthesis.

use thiserror::Error;
use ttm_convection::ConvectionError;
use ttm_project::ProjectError;
use ttm_results::ResultsError;

#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("Solver output: {0}")]
    Results(#[from] ResultsError),

    #[error("Configuration: {0}")]
    Project(#[from] ProjectError),

    #[error("Convection: {0}")]
    Convection(#[from] ConvectionError),

    #[error("Audit log: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BoundaryResult<T> = Result<T, BoundaryError>;
