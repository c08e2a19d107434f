//! Error types for cargo layout.

use thiserror::Error;
use ttm_core::TtmError;

/// Configuration errors; all raised before any region is created.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CargoError {
    #[error(
        "Freight does not fit into packaging along axis {axis}: package {package_m} m, freight element {freight_m} m"
    )]
    FreightDoesNotFit {
        axis: usize,
        package_m: f64,
        freight_m: f64,
    },

    #[error("Volume of freight is 0, check freight dimensions")]
    ZeroFreightVolume,

    #[error("Unknown package template: {name}")]
    UnknownTemplate { name: String },

    #[error("Unknown freight type: {name} (expected cells, modules or pack)")]
    UnknownFreightType { name: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type CargoResult<T> = Result<T, CargoError>;

impl From<TtmError> for CargoError {
    fn from(e: TtmError) -> Self {
        match e {
            TtmError::NonFinite { what, .. }
            | TtmError::NonPositive { what, .. }
            | TtmError::InvalidArg { what } => CargoError::InvalidArg { what },
            TtmError::InvalidRegion { .. } => CargoError::InvalidArg { what: "region name" },
        }
    }
}
