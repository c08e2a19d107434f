// ttm-core/src/units.rs

use uom::si::f64::{
    HeatTransfer as UomHeatTransfer, Length as UomLength, MassDensity as UomMassDensity,
    SpecificHeatCapacity as UomSpecificHeatCapacity,
    ThermalConductivity as UomThermalConductivity,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
    Velocity as UomVelocity,
};

// Public canonical unit types (SI, f64)
pub type HeatTransfer = UomHeatTransfer;
pub type Length = UomLength;
pub type Density = UomMassDensity;
pub type SpecificHeat = UomSpecificHeatCapacity;
pub type Conductivity = UomThermalConductivity;
pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;
pub type Velocity = UomVelocity;

/// Offset between the Celsius and Kelvin scales.
pub const CELSIUS_OFFSET_K: f64 = 273.15;

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn deg_c(v: f64) -> Temperature {
    k(v + CELSIUS_OFFSET_K)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn w_per_m2k(v: f64) -> HeatTransfer {
    use uom::si::heat_transfer::watt_per_square_meter_kelvin;
    HeatTransfer::new::<watt_per_square_meter_kelvin>(v)
}

#[inline]
pub fn w_per_mk(v: f64) -> Conductivity {
    use uom::si::thermal_conductivity::watt_per_meter_kelvin;
    Conductivity::new::<watt_per_meter_kelvin>(v)
}

#[inline]
pub fn kg_per_m3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

#[inline]
pub fn j_per_kgk(v: f64) -> SpecificHeat {
    use uom::si::specific_heat_capacity::joule_per_kilogram_kelvin;
    SpecificHeat::new::<joule_per_kilogram_kelvin>(v)
}

/// Kelvin reading converted to Celsius.
#[inline]
pub fn kelvin_to_celsius(t_k: f64) -> f64 {
    t_k - CELSIUS_OFFSET_K
}

pub mod constants {
    use super::*;

    pub const G_MPS2: f64 = 9.81;

    #[inline]
    pub fn g() -> f64 {
        G_MPS2
    }

    /// Mean earth radius used for great-circle distances.
    pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

    #[inline]
    pub fn earth_radius() -> Length {
        m(EARTH_RADIUS_M)
    }
}
