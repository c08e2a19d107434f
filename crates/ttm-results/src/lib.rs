//! ttm-results: inspection of the solver's on-disk output and stitching of
//! restart fragments into continuous per-region time series.

pub mod aggregate;
pub mod fragments;
pub mod timedirs;
pub mod types;

pub use aggregate::{
    AggregateOptions, CARGO_SERIES, Phase, PostprocessSummary, aggregate_region, cargo_series,
    postprocess, wall_heat_flux,
};
pub use fragments::{
    Fragment, Metric, discard_fragments_from, list_fragments, read_fragment, read_table, value_at,
};
pub use timedirs::{SolverTree, TimeDir};
pub use types::*;

use std::path::PathBuf;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing solver output: {path}")]
    MissingOutput { path: PathBuf },

    #[error("No {metric} fragments for region {region}")]
    NoFragments { region: String, metric: String },

    #[error("No time directories to postprocess")]
    NoTimes,

    #[error("Malformed output {path} line {line}: {what}")]
    Parse {
        path: PathBuf,
        line: usize,
        what: String,
    },
}
