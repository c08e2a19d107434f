//! Closed-form Nusselt correlations.

use crate::error::ConvectionResult;
use ttm_core::units::{HeatTransfer, Length, Temperature, Velocity, constants, w_per_m2k};
use ttm_core::{ensure_finite, ensure_positive};

/// Constant reference-fluid properties.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AirProperties {
    /// Prandtl number
    pub prandtl: f64,
    /// Kinematic viscosity (m²/s)
    pub kinematic_viscosity: f64,
    /// Thermal conductivity (W/(m·K))
    pub conductivity: f64,
}

/// Air at 20 °C.
pub const AIR_20C: AirProperties = AirProperties {
    prandtl: 0.718,
    kinematic_viscosity: 13.3e-6,
    conductivity: 0.0262,
};

/// Base Nusselt number of the natural-convection correlation.
const NU_0: f64 = 1.0;

impl AirProperties {
    /// Gr = g·β·L³·|T_W − T_U| / ν², with β = 1/T_U (ideal gas).
    pub fn grashof(&self, l_m: f64, t_wall_k: f64, t_ambient_k: f64) -> f64 {
        let beta = 1.0 / t_ambient_k;
        constants::g() * beta * l_m.powi(3) * (t_wall_k - t_ambient_k).abs()
            / self.kinematic_viscosity.powi(2)
    }

    pub fn rayleigh(&self, grashof: f64) -> f64 {
        grashof * self.prandtl
    }

    /// Prandtl correction f(Pr) of the natural-convection correlation.
    pub fn prandtl_correction(&self) -> f64 {
        0.765 + 0.03 * (self.prandtl - 0.7) / 0.3
    }

    pub fn nusselt_natural(&self, rayleigh: f64) -> f64 {
        NU_0 + 0.668 * self.prandtl_correction() * rayleigh.powf(0.25)
    }

    pub fn reynolds(&self, l_m: f64, u_mps: f64) -> f64 {
        u_mps * l_m / self.kinematic_viscosity
    }

    /// Turbulent flat plate. Negative below the transition Reynolds number;
    /// callers screen the result.
    pub fn nusselt_forced(&self, reynolds: f64) -> f64 {
        0.037 * (reynolds.powf(0.8) - 23_100.0) * self.prandtl.powf(1.0 / 3.0)
    }

    fn coefficient(&self, nusselt: f64, l_m: f64) -> f64 {
        nusselt * self.conductivity / l_m
    }
}

/// Natural-convection coefficient for a wall of characteristic length `l`.
///
/// `t_ambient` must be an absolute, nonzero temperature.
pub fn natural(
    l: Length,
    t_wall: Temperature,
    t_ambient: Temperature,
) -> ConvectionResult<HeatTransfer> {
    let l_m = ensure_positive(l.value, "characteristic length")?;
    let t_ambient_k = ensure_positive(t_ambient.value, "ambient temperature")?;
    let t_wall_k = ensure_finite(t_wall.value, "wall temperature")?;

    let air = AIR_20C;
    let gr = air.grashof(l_m, t_wall_k, t_ambient_k);
    let ra = air.rayleigh(gr);
    let nu = air.nusselt_natural(ra);
    let h = ensure_finite(air.coefficient(nu, l_m), "natural convection coefficient")?;
    Ok(w_per_m2k(h))
}

/// Forced-convection coefficient for air moving at `u` along length `l`.
pub fn forced(l: Length, u: Velocity) -> ConvectionResult<HeatTransfer> {
    let l_m = ensure_positive(l.value, "characteristic length")?;
    let u_mps = ensure_finite(u.value, "velocity")?.abs();

    let air = AIR_20C;
    let re = air.reynolds(l_m, u_mps);
    let nu = air.nusselt_forced(re);
    let h = ensure_finite(air.coefficient(nu, l_m), "forced convection coefficient")?;
    Ok(w_per_m2k(h))
}
