//! Error types for the campaign controller.

use ttm_boundary::BoundaryError;
use ttm_cargo::CargoError;
use ttm_project::ProjectError;
use ttm_results::ResultsError;

use crate::solver::SolverStep;

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("Campaign configuration error: {what}")]
    Configuration { what: String },

    #[error("Solver did not advance from t={from_s} s to t={to_s} s")]
    SolverDidNotAdvance { from_s: f64, to_s: f64 },

    #[error("Solver step {step} failed: {status}")]
    SolverFailed { step: SolverStep, status: String },

    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    #[error("Cargo error: {0}")]
    Cargo(#[from] CargoError),

    #[error("Results error: {0}")]
    Results(#[from] ResultsError),

    #[error("Boundary error: {0}")]
    Boundary(#[from] BoundaryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CampaignResult<T> = Result<T, CampaignError>;

impl CampaignError {
    pub(crate) fn configuration(what: impl Into<String>) -> Self {
        CampaignError::Configuration { what: what.into() }
    }
}
