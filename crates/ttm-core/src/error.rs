use thiserror::Error;

pub type TtmResult<T> = Result<T, TtmError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TtmError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Value for {what} must be positive, got {value}")]
    NonPositive { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid region name: {name}")]
    InvalidRegion { name: String },
}
