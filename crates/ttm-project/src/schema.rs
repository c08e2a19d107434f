//! Campaign file schema.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use ttm_cargo::{CargoLayout, CargoPlacement, CargoResult, Freight, PackageTemplate, lay_out_all};
use ttm_core::RegionName;

use crate::carrier::CarrierKind;

pub const CAMPAIGN_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignDef {
    pub version: u32,
    pub name: String,
    pub carrier: CarrierKind,
    /// Initial temperature of every region in °C.
    pub initial_temperature_c: f64,
    /// Ambient temperature at the destination in °C.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_temperature_c: Option<f64>,
    #[serde(default)]
    pub cargo: Vec<CargoDef>,
    #[serde(default)]
    pub solver: SolverDef,
    #[serde(default)]
    pub tuning: TuningDef,
    /// Fixed UTC offset in hours; when absent the offset is resolved per waypoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset_hours: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CargoDef {
    Pallet {
        template: String,
        #[serde(default)]
        position_m: [f64; 3],
        #[serde(default)]
        orientation_deg: [f64; 3],
        freight: FreightDef,
    },
    Car {
        template: String,
        freight: FreightDef,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FreightDef {
    #[serde(rename = "type")]
    pub freight_type: String,
    pub dimensions_m: [f64; 3],
    pub weight_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements_in_package: Option<[usize; 3]>,
    #[serde(default = "default_heat_capacity")]
    pub heat_capacity_j_per_kgk: f64,
    #[serde(default = "default_conductivity")]
    pub conductivity_w_per_mk: [f64; 3],
}

fn default_heat_capacity() -> f64 {
    Freight::DEFAULT_HEAT_CAPACITY
}

fn default_conductivity() -> [f64; 3] {
    [
        Freight::DEFAULT_CONDUCTIVITY_RADIAL,
        Freight::DEFAULT_CONDUCTIVITY_RADIAL,
        Freight::DEFAULT_CONDUCTIVITY_AXIAL,
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<usize>,
    /// Keep only the two most recent time directories after each segment.
    #[serde(default)]
    pub purge_write: bool,
    #[serde(default = "default_solver_log")]
    pub solver_log: String,
}

fn default_solver_log() -> String {
    "log.chtMultiRegionFoam".to_string()
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            cpu_cores: None,
            purge_write: false,
            solver_log: default_solver_log(),
        }
    }
}

/// Engineering constants that may be overridden per campaign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TuningDef {
    /// Below this travel speed natural convection is assumed.
    pub speed_threshold_mps: f64,
    /// Coefficients below this are treated as implausible.
    pub coefficient_floor_w_per_m2k: f64,
    /// Arrival stops once every cargo extreme is this close to ambient.
    pub arrival_threshold_k: f64,
    pub arrival_chunk_s: f64,
    pub max_arrival_chunks: usize,
}

impl Default for TuningDef {
    fn default() -> Self {
        Self {
            speed_threshold_mps: 4.0,
            coefficient_floor_w_per_m2k: 0.2,
            arrival_threshold_k: 1.0,
            arrival_chunk_s: 14400.0,
            max_arrival_chunks: 100,
        }
    }
}

impl FreightDef {
    pub fn to_freight(&self) -> CargoResult<Freight> {
        Ok(Freight {
            freight_type: self.freight_type.parse()?,
            dimensions_m: Vector3::from(self.dimensions_m),
            weight_kg: self.weight_kg,
            elements_in_package: self.elements_in_package,
            heat_capacity_j_per_kgk: self.heat_capacity_j_per_kgk,
            conductivity_w_per_mk: Vector3::from(self.conductivity_w_per_mk),
        })
    }
}

impl CargoDef {
    pub fn freight(&self) -> &FreightDef {
        match self {
            CargoDef::Pallet { freight, .. } | CargoDef::Car { freight, .. } => freight,
        }
    }

    pub fn to_placement(&self) -> CargoResult<(CargoPlacement, Freight)> {
        let placement = match self {
            CargoDef::Pallet {
                template,
                position_m,
                orientation_deg,
                ..
            } => CargoPlacement::Pallet {
                template: PackageTemplate::builtin(template)?,
                position_m: Vector3::from(*position_m),
                orientation_deg: Vector3::from(*orientation_deg),
            },
            CargoDef::Car { template, .. } => CargoPlacement::Car {
                template: PackageTemplate::builtin(template)?,
            },
        };
        Ok((placement, self.freight().to_freight()?))
    }
}

impl CampaignDef {
    pub fn initial_temperature_k(&self) -> f64 {
        ttm_core::deg_c(self.initial_temperature_c).value
    }

    pub fn arrival_temperature_k(&self) -> Option<f64> {
        self.arrival_temperature_c.map(|t| ttm_core::deg_c(t).value)
    }

    /// Lay out every cargo item in file order.
    pub fn layouts(&self) -> CargoResult<Vec<CargoLayout>> {
        let items = self
            .cargo
            .iter()
            .map(CargoDef::to_placement)
            .collect::<CargoResult<Vec<_>>>()?;
        lay_out_all(&items)
    }

    /// Region whose outer boundary sees the ambient air.
    pub fn border_region(&self) -> RegionName {
        if self.carrier.is_car() {
            RegionName::battery(0, 0)
        } else {
            RegionName::interior_air()
        }
    }
}
