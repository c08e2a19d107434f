//! Plausibility screening of convective coefficients.

use nalgebra::Vector3;
use tracing::warn;
use ttm_convection::{ConvectionOutcome, Regime};

/// Dominant convection lengths of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallGeometry {
    /// Vertical extent; used for natural convection.
    pub height_m: f64,
    /// Extent along the direction of travel; used for forced convection.
    pub length_m: f64,
}

impl WallGeometry {
    pub fn from_dimensions(dimensions_m: &Vector3<f64>) -> Self {
        Self {
            height_m: dimensions_m.z,
            length_m: dimensions_m.x,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoefficientSource {
    /// The correlation result was used as is.
    Computed,
    /// Implausible result replaced by the last logged value.
    Substituted,
    /// Implausible result and nothing logged yet; the floor is used.
    Floor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficient {
    pub value_w_per_m2k: f64,
    pub source: CoefficientSource,
    pub regime: Regime,
    /// Raw correlation result before screening.
    pub computed_w_per_m2k: f64,
    pub characteristic_length_m: f64,
}

/// Replace a coefficient below `floor` with `last_good`, or the floor itself.
pub fn plausible_coefficient(
    outcome: &ConvectionOutcome,
    floor_w_per_m2k: f64,
    last_good: Option<f64>,
) -> Coefficient {
    let computed = outcome.coefficient.value;
    let (value, source) = if computed.is_finite() && computed >= floor_w_per_m2k {
        (computed, CoefficientSource::Computed)
    } else if let Some(previous) = last_good {
        warn!(
            computed,
            substitute = previous,
            "implausible heat transfer coefficient, using last logged value"
        );
        (previous, CoefficientSource::Substituted)
    } else {
        warn!(
            computed,
            floor = floor_w_per_m2k,
            "implausible heat transfer coefficient and no logged value, using floor"
        );
        (floor_w_per_m2k, CoefficientSource::Floor)
    };
    Coefficient {
        value_w_per_m2k: value,
        source,
        regime: outcome.regime,
        computed_w_per_m2k: computed,
        characteristic_length_m: outcome.characteristic_length.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttm_core::units::{m, w_per_m2k};

    fn outcome(h: f64) -> ConvectionOutcome {
        ConvectionOutcome {
            regime: Regime::Natural,
            characteristic_length: m(2.0),
            coefficient: w_per_m2k(h),
        }
    }

    #[test]
    fn plausible_value_passes_through() {
        let c = plausible_coefficient(&outcome(3.2), 0.2, Some(1.0));
        assert_eq!(c.source, CoefficientSource::Computed);
        assert_eq!(c.value_w_per_m2k, 3.2);
    }

    #[test]
    fn low_value_substituted_from_log() {
        let c = plausible_coefficient(&outcome(0.05), 0.2, Some(2.5));
        assert_eq!(c.source, CoefficientSource::Substituted);
        assert_eq!(c.value_w_per_m2k, 2.5);
        assert_eq!(c.computed_w_per_m2k, 0.05);
    }

    #[test]
    fn negative_value_without_log_uses_floor() {
        let c = plausible_coefficient(&outcome(-4.0), 0.2, None);
        assert_eq!(c.source, CoefficientSource::Floor);
        assert_eq!(c.value_w_per_m2k, 0.2);
    }
}
