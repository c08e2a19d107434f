//! Convective heat-transfer coefficients for the carrier and cargo walls.
//!
//! Two regimes, selected by relative air velocity:
//! - natural convection (buoyancy driven, Prandtl-corrected vertical-plate correlation)
//! - forced convection (turbulent flat-plate correlation)
//!
//! Fluid properties are those of air at 20 °C, held constant.

pub mod correlations;
pub mod error;
pub mod regime;

pub use correlations::{AIR_20C, AirProperties, forced, natural};
pub use error::{ConvectionError, ConvectionResult};
pub use regime::{
    ConvectionInput, ConvectionOutcome, DEFAULT_SPEED_THRESHOLD_MPS, Regime,
    heat_transfer_coefficient,
};
