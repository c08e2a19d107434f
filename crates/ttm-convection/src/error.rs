//! Error types for convection calculations.

use thiserror::Error;
use ttm_core::TtmError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvectionError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-finite result for {what}")]
    NonFinite { what: &'static str },
}

pub type ConvectionResult<T> = Result<T, ConvectionError>;

impl From<TtmError> for ConvectionError {
    fn from(e: TtmError) -> Self {
        match e {
            TtmError::NonFinite { what, .. } => ConvectionError::NonFinite { what },
            TtmError::NonPositive { what, .. } => ConvectionError::InvalidArg { what },
            TtmError::InvalidArg { what } => ConvectionError::InvalidArg { what },
            TtmError::InvalidRegion { .. } => ConvectionError::InvalidArg { what: "region" },
        }
    }
}
