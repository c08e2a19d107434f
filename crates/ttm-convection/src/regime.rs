//! Regime selection between natural and forced convection.

use crate::correlations::{forced, natural};
use crate::error::ConvectionResult;
use ttm_core::units::{HeatTransfer, Length, Temperature, Velocity};

/// Relative velocity at and above which forced convection applies.
pub const DEFAULT_SPEED_THRESHOLD_MPS: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Regime {
    Natural,
    Forced,
}

impl Regime {
    /// Natural on `[0, threshold)`, forced on `[threshold, ∞)`.
    pub fn select(velocity: Velocity, threshold: Velocity) -> Self {
        if velocity.value.abs() < threshold.value {
            Regime::Natural
        } else {
            Regime::Forced
        }
    }
}

/// Wall geometry and thermal state for one coefficient evaluation.
#[derive(Clone, Copy, Debug)]
pub struct ConvectionInput {
    /// Height of the body; dominant length for natural convection.
    pub height: Length,
    /// Length along the direction of travel; dominant length for forced convection.
    pub length: Length,
    pub t_wall: Temperature,
    pub t_ambient: Temperature,
    pub velocity: Velocity,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvectionOutcome {
    pub regime: Regime,
    pub characteristic_length: Length,
    pub coefficient: HeatTransfer,
}

pub fn heat_transfer_coefficient(
    input: &ConvectionInput,
    threshold: Velocity,
) -> ConvectionResult<ConvectionOutcome> {
    let regime = Regime::select(input.velocity, threshold);
    let (characteristic_length, coefficient) = match regime {
        Regime::Natural => (
            input.height,
            natural(input.height, input.t_wall, input.t_ambient)?,
        ),
        Regime::Forced => (input.length, forced(input.length, input.velocity)?),
    };
    Ok(ConvectionOutcome {
        regime,
        characteristic_length,
        coefficient,
    })
}
