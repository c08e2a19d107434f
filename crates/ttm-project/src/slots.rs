//! Typed accessors for the configuration slots the campaign touches.
//!
//! Every key path used against the solver configuration lives here.

use nalgebra::Vector3;
use serde_json::{Value, json};
use ttm_cargo::HomogenizedProperties;
use ttm_core::{LatLon, RegionName};

use crate::carrier::{CELL_SIZE_M, CarrierSpec};
use crate::store::{ConfigStore, KeyPath};
use crate::{ProjectError, ProjectResult};

const CONTROL: &str = "system/controlDict";
const REGIONS: &str = "constant/regionProperties";
const BLOCK_MESH: &str = "system/blockMeshDict";
const SNAPPY: &str = "system/snappyHexMeshDict";
const DECOMPOSE: &str = "system/decomposeParDict";
const PROBES: &str = "system/probes";
const CARRIER_RADIATION: &str = "constant/airInside/boundaryRadiationProperties";

/// Patch names on the interior air region.
pub const CARRIER_PATCH: &str = "carrier";
pub const FLOOR_PATCH: &str = "bottom";

/// Write intervals below this run with a fixed time step.
pub const ADJUST_TIME_STEP_MIN_INTERVAL_S: f64 = 1000.0;

/// Function objects sampled per region.
pub const REGION_FUNCTIONS: [&str; 4] = ["average", "min", "max", "wallTemperature"];

fn thermophysical(region: &RegionName) -> String {
    format!("constant/{region}/thermophysicalProperties")
}

fn change_dictionary(region: &RegionName) -> String {
    format!("system/{region}/changeDictionaryDict")
}

fn radiation(region: &RegionName) -> String {
    format!("constant/{region}/radiationProperties")
}

/// Name of the coupling patch between a cargo region and the interior air.
pub fn cargo_patch(region: &RegionName) -> String {
    format!("{region}_to_airInside")
}

fn vector(v: &Vector3<f64>) -> Value {
    json!([v.x, v.y, v.z])
}

fn as_vector(value: &Value) -> Option<Vector3<f64>> {
    let items = value.as_array()?;
    if items.len() != 3 {
        return None;
    }
    Some(Vector3::new(
        items[0].as_f64()?,
        items[1].as_f64()?,
        items[2].as_f64()?,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunControl {
    pub end_time_s: f64,
    pub write_interval_s: f64,
    pub adjust_time_step: bool,
}

impl RunControl {
    /// Advance from `start_s` by `duration_s`; one write at the end.
    pub fn for_interval(start_s: f64, duration_s: f64) -> Self {
        let write_interval_s = duration_s.floor();
        Self {
            end_time_s: start_s + duration_s,
            write_interval_s,
            adjust_time_step: write_interval_s >= ADJUST_TIME_STEP_MIN_INTERVAL_S,
        }
    }
}

/// Thermal resistance layer in front of a wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallLayer {
    pub conductivity_w_per_mk: f64,
    pub thickness_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvectiveBoundary {
    /// Heat transfer coefficient; `None` keeps the patch adiabatic to ambient convection.
    pub h_w_per_m2k: Option<f64>,
    pub ambient_k: f64,
    pub wall: Option<WallLayer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarLoad {
    /// Day of year at campaign start, local time.
    pub start_day: Option<u32>,
    /// Decimal hour at campaign start, local time.
    pub start_hour: Option<f64>,
    /// UTC offset in hours.
    pub local_standard_meridian: Option<f64>,
    pub location: LatLon,
    /// Apparent solar irradiation `A` in W/m².
    pub solar_intensity_w_per_m2: f64,
    /// Atmospheric extinction coefficient `B`.
    pub extinction_coefficient: f64,
    pub grid_east: Option<Vector3<f64>>,
}

pub struct BoundarySlots<'a, S: ConfigStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: ConfigStore + ?Sized> BoundarySlots<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    fn set(&mut self, document: &str, keys: &[&str], value: Value) -> ProjectResult<()> {
        self.store.write(&KeyPath::new(document, keys), value)
    }

    fn get(&self, document: &str, keys: &[&str]) -> ProjectResult<Option<Value>> {
        self.store.read(&KeyPath::new(document, keys))
    }

    pub fn flush(&mut self) -> ProjectResult<()> {
        self.store.flush()
    }

    // --- run control

    pub fn set_run_control(&mut self, control: &RunControl) -> ProjectResult<()> {
        self.set(CONTROL, &["endTime"], json!(control.end_time_s))?;
        self.set(CONTROL, &["writeInterval"], json!(control.write_interval_s))?;
        self.set(CONTROL, &["adjustTimeStep"], json!(control.adjust_time_step))
    }

    pub fn end_time_s(&self) -> ProjectResult<Option<f64>> {
        Ok(self.get(CONTROL, &["endTime"])?.and_then(|v| v.as_f64()))
    }

    pub fn run_control(&self) -> ProjectResult<Option<RunControl>> {
        let end = self.get(CONTROL, &["endTime"])?.and_then(|v| v.as_f64());
        let interval = self.get(CONTROL, &["writeInterval"])?.and_then(|v| v.as_f64());
        let adjust = self.get(CONTROL, &["adjustTimeStep"])?.and_then(|v| v.as_bool());
        Ok(match (end, interval, adjust) {
            (Some(end_time_s), Some(write_interval_s), Some(adjust_time_step)) => Some(RunControl {
                end_time_s,
                write_interval_s,
                adjust_time_step,
            }),
            _ => None,
        })
    }

    pub fn set_function_enabled(&mut self, function: &str, enabled: bool) -> ProjectResult<()> {
        self.set(CONTROL, &["functions", function, "enabled"], json!(enabled))
    }

    pub fn function_enabled(&self, function: &str) -> ProjectResult<bool> {
        Ok(self
            .get(CONTROL, &["functions", function, "enabled"])?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    /// Register the per-region sampling function objects.
    pub fn set_region_functions(&mut self, region: &RegionName) -> ProjectResult<()> {
        for function in REGION_FUNCTIONS {
            let name = format!("{function}_{region}");
            self.set(CONTROL, &["functions", &name, "region"], json!(region.as_str()))?;
            self.set(CONTROL, &["functions", &name, "enabled"], json!(true))?;
        }
        if region.is_cargo() {
            let name = format!("wallTemperature_{region}");
            self.set(CONTROL, &["functions", &name, "patch"], json!(cargo_patch(region)))?;
        } else {
            self.set_function_enabled("wallHeatFlux", true)?;
        }
        Ok(())
    }

    /// Disable every function object sampling `region`.
    pub fn disable_region_functions(&mut self, region: &RegionName) -> ProjectResult<()> {
        for function in REGION_FUNCTIONS {
            self.set_function_enabled(&format!("{function}_{region}"), false)?;
        }
        if region.is_interior_air() {
            self.set_function_enabled("wallHeatFlux", false)?;
        }
        Ok(())
    }

    // --- regions

    pub fn set_regions(&mut self, fluid: &[RegionName], solid: &[RegionName]) -> ProjectResult<()> {
        let names = |r: &[RegionName]| r.iter().map(|n| json!(n.as_str())).collect::<Vec<_>>();
        self.set(REGIONS, &["regions", "fluid"], Value::Array(names(fluid)))?;
        self.set(REGIONS, &["regions", "solid"], Value::Array(names(solid)))
    }

    fn region_list(&self, kind: &str) -> ProjectResult<Vec<RegionName>> {
        let Some(value) = self.get(REGIONS, &["regions", kind])? else {
            return Ok(Vec::new());
        };
        let items = value.as_array().ok_or_else(|| ProjectError::Store {
            document: REGIONS.to_string(),
            what: format!("regions.{kind} is not a list"),
        })?;
        items
            .iter()
            .map(|item| {
                let name = item.as_str().ok_or_else(|| ProjectError::Store {
                    document: REGIONS.to_string(),
                    what: format!("regions.{kind} holds a non-string entry"),
                })?;
                RegionName::parse(name).map_err(|e| ProjectError::Store {
                    document: REGIONS.to_string(),
                    what: e.to_string(),
                })
            })
            .collect()
    }

    /// Every region, fluid first.
    pub fn regions(&self) -> ProjectResult<Vec<RegionName>> {
        let mut all = self.region_list("fluid")?;
        all.extend(self.region_list("solid")?);
        Ok(all)
    }

    pub fn remove_fluid_regions(&mut self) -> ProjectResult<()> {
        self.set(REGIONS, &["regions", "fluid"], json!([]))
    }

    // --- geometry

    pub fn set_background_mesh(&mut self, carrier: &CarrierSpec) -> ProjectResult<()> {
        let [nx, ny, nz] = carrier.block_counts();
        self.set(BLOCK_MESH, &["length"], json!(nx as f64 * CELL_SIZE_M))?;
        self.set(BLOCK_MESH, &["width"], json!(ny as f64 * CELL_SIZE_M / 2.0))?;
        self.set(BLOCK_MESH, &["negWidth"], json!(-(ny as f64) * CELL_SIZE_M / 2.0))?;
        self.set(BLOCK_MESH, &["height"], json!(nz as f64 * CELL_SIZE_M))?;
        self.set(BLOCK_MESH, &["blocks"], json!([nx, ny, nz]))
    }

    /// Carrier box, wall layer and wall radiation properties.
    pub fn set_carrier_geometry(&mut self, carrier: &CarrierSpec) -> ProjectResult<()> {
        let half_width = carrier.width_m / 2.0;
        self.set(SNAPPY, &["geometry", "carrier", "min"], json!([0.0005, -half_width, -0.0005]))?;
        self.set(
            SNAPPY,
            &["geometry", "carrier", "max"],
            json!([carrier.length_m, half_width, carrier.height_m]),
        )?;
        let air = RegionName::interior_air();
        let doc = change_dictionary(&air);
        self.set(
            &doc,
            &["T", "boundaryField", CARRIER_PATCH, "kappaLayers"],
            json!([carrier.wall_conductivity_w_per_mk]),
        )?;
        self.set(
            &doc,
            &["T", "boundaryField", CARRIER_PATCH, "thicknessLayers"],
            json!([carrier.wall_thickness_m]),
        )?;
        let model = ["carrier", "wallAbsorptionEmissionModel"];
        self.set(
            CARRIER_RADIATION,
            &[model[0], model[1], "absorptivity"],
            json!([carrier.absorptivity, carrier.absorptivity]),
        )?;
        self.set(
            CARRIER_RADIATION,
            &[model[0], model[1], "emissivity"],
            json!([carrier.absorptivity, carrier.absorptivity]),
        )
    }

    pub fn carrier_dimensions_m(&self) -> ProjectResult<Option<Vector3<f64>>> {
        Ok(self
            .get(SNAPPY, &["geometry", "carrier", "max"])?
            .as_ref()
            .and_then(as_vector)
            .map(|max| Vector3::new(max.x, 2.0 * max.y, max.z)))
    }

    pub fn set_locations_in_mesh(&mut self, locations: &[(RegionName, Vector3<f64>)]) -> ProjectResult<()> {
        let entries = locations
            .iter()
            .map(|(name, p)| json!([[p.x, p.y, p.z], name.as_str()]))
            .collect();
        self.set(
            SNAPPY,
            &["castellatedMeshControls", "locationsInMesh"],
            Value::Array(entries),
        )
    }

    // --- thermophysical properties

    pub fn set_thermophysical(
        &mut self,
        region: &RegionName,
        properties: &HomogenizedProperties,
    ) -> ProjectResult<()> {
        let doc = thermophysical(region);
        self.set(
            &doc,
            &["mixture", "thermodynamics", "Cp"],
            json!(properties.heat_capacity_j_per_kgk),
        )?;
        self.set(
            &doc,
            &["mixture", "equationOfState", "rho"],
            json!(properties.density_kg_per_m3),
        )?;
        self.set(
            &doc,
            &["mixture", "transport", "kappa"],
            vector(&properties.conductivity_w_per_mk),
        )
    }

    pub fn set_initial_temperature(&mut self, region: &RegionName, t_k: f64) -> ProjectResult<()> {
        self.set(&change_dictionary(region), &["T", "internalField"], json!(t_k))
    }

    pub fn initial_temperature_k(&self, region: &RegionName) -> ProjectResult<Option<f64>> {
        Ok(self
            .get(&change_dictionary(region), &["T", "internalField"])?
            .and_then(|v| v.as_f64()))
    }

    /// Drop the initial field so a later boundary update does not reset the solution.
    pub fn clear_initial_temperature(&mut self, region: &RegionName) -> ProjectResult<()> {
        self.store
            .remove(&KeyPath::new(change_dictionary(region), &["T", "internalField"]))?;
        Ok(())
    }

    // --- convective boundary

    pub fn set_convective(
        &mut self,
        region: &RegionName,
        patch: &str,
        boundary: &ConvectiveBoundary,
    ) -> ProjectResult<()> {
        let doc = change_dictionary(region);
        let base = ["T", "boundaryField", patch];
        let key = |k: &'static str| [base[0], base[1], base[2], k];
        match boundary.h_w_per_m2k {
            Some(h) => self.set(&doc, &key("h"), json!(h))?,
            None => {
                self.store.remove(&KeyPath::new(doc.as_str(), &key("h")))?;
            }
        }
        self.set(&doc, &key("Ta"), json!(boundary.ambient_k))?;
        if let Some(wall) = boundary.wall {
            self.set(&doc, &key("kappaLayers"), json!([wall.conductivity_w_per_mk]))?;
            self.set(&doc, &key("thicknessLayers"), json!([wall.thickness_m]))?;
        }
        Ok(())
    }

    pub fn convective(&self, region: &RegionName, patch: &str) -> ProjectResult<Option<ConvectiveBoundary>> {
        let doc = change_dictionary(region);
        let ambient = self
            .get(&doc, &["T", "boundaryField", patch, "Ta"])?
            .and_then(|v| v.as_f64());
        let Some(ambient_k) = ambient else {
            return Ok(None);
        };
        let h = self
            .get(&doc, &["T", "boundaryField", patch, "h"])?
            .and_then(|v| v.as_f64());
        let first = |v: Option<Value>| v.and_then(|v| v.as_array().and_then(|a| a.first()?.as_f64()));
        let kappa = first(self.get(&doc, &["T", "boundaryField", patch, "kappaLayers"])?);
        let thickness = first(self.get(&doc, &["T", "boundaryField", patch, "thicknessLayers"])?);
        let wall = match (kappa, thickness) {
            (Some(conductivity_w_per_mk), Some(thickness_m)) => Some(WallLayer {
                conductivity_w_per_mk,
                thickness_m,
            }),
            _ => None,
        };
        Ok(Some(ConvectiveBoundary {
            h_w_per_m2k: h,
            ambient_k,
            wall,
        }))
    }

    // --- solar load

    pub fn set_solar(&mut self, region: &RegionName, solar: &SolarLoad) -> ProjectResult<()> {
        let doc = radiation(region);
        let coeffs = "solarLoadCoeffs";
        self.set(&doc, &["radiation"], json!("on"))?;
        if let Some(day) = solar.start_day {
            self.set(&doc, &[coeffs, "startDay"], json!(day))?;
        }
        if let Some(hour) = solar.start_hour {
            self.set(&doc, &[coeffs, "startTime"], json!(hour))?;
        }
        if let Some(meridian) = solar.local_standard_meridian {
            self.set(&doc, &[coeffs, "localStandardMeridian"], json!(meridian))?;
        }
        self.set(&doc, &[coeffs, "latitude"], json!(solar.location.lat_deg))?;
        self.set(&doc, &[coeffs, "longitude"], json!(solar.location.lon_deg))?;
        self.set(&doc, &[coeffs, "A"], json!(solar.solar_intensity_w_per_m2))?;
        self.set(&doc, &[coeffs, "B"], json!(solar.extinction_coefficient))?;
        if let Some(east) = &solar.grid_east {
            self.set(&doc, &[coeffs, "gridEast"], vector(east))?;
        }
        Ok(())
    }

    pub fn grid_east(&self, region: &RegionName) -> ProjectResult<Option<Vector3<f64>>> {
        Ok(self
            .get(&radiation(region), &["solarLoadCoeffs", "gridEast"])?
            .as_ref()
            .and_then(as_vector))
    }

    // --- probes

    pub fn probe_locations(&self) -> ProjectResult<Vec<Vector3<f64>>> {
        let Some(value) = self.get(PROBES, &["probeLocations"])? else {
            return Ok(Vec::new());
        };
        let items = value.as_array().ok_or_else(|| ProjectError::Store {
            document: PROBES.to_string(),
            what: "probeLocations is not a list".to_string(),
        })?;
        items
            .iter()
            .map(|item| {
                as_vector(item).ok_or_else(|| ProjectError::Store {
                    document: PROBES.to_string(),
                    what: format!("invalid probe location {item}"),
                })
            })
            .collect()
    }

    pub fn set_probe_locations(&mut self, locations: &[Vector3<f64>]) -> ProjectResult<()> {
        self.set(PROBES, &["fields"], json!(["T"]))?;
        self.set(
            PROBES,
            &["probeLocations"],
            Value::Array(locations.iter().map(vector).collect()),
        )
    }

    // --- decomposition

    pub fn cpu_cores(&self) -> ProjectResult<Option<usize>> {
        Ok(self
            .get(DECOMPOSE, &["numberOfSubdomains"])?
            .and_then(|v| v.as_u64())
            .map(|n| n as usize))
    }

    pub fn set_cpu_cores(&mut self, cores: usize) -> ProjectResult<()> {
        self.set(DECOMPOSE, &["numberOfSubdomains"], json!(cores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::CarrierKind;
    use crate::store::FileConfigStore;

    #[test]
    fn run_control_disables_adjust_for_short_intervals() {
        let short = RunControl::for_interval(3600.0, 600.5);
        assert_eq!(short.end_time_s, 4200.5);
        assert_eq!(short.write_interval_s, 600.0);
        assert!(!short.adjust_time_step);
        assert!(RunControl::for_interval(0.0, 3600.0).adjust_time_step);
    }

    #[test]
    fn run_control_round_trips_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path());
        let mut slots = BoundarySlots::new(&mut store);
        let control = RunControl::for_interval(0.0, 3600.0);
        slots.set_run_control(&control).unwrap();
        assert_eq!(slots.run_control().unwrap(), Some(control));
    }

    #[test]
    fn regions_fluid_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path());
        let mut slots = BoundarySlots::new(&mut store);
        slots
            .set_regions(
                &[RegionName::interior_air()],
                &[RegionName::battery(0, 0), RegionName::battery(0, 1)],
            )
            .unwrap();
        let names: Vec<String> = slots
            .regions()
            .unwrap()
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(names, ["airInside", "battery0_0", "battery0_1"]);

        slots.remove_fluid_regions().unwrap();
        assert_eq!(slots.regions().unwrap().len(), 2);
    }

    #[test]
    fn convective_boundary_without_h_removes_old_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path());
        let mut slots = BoundarySlots::new(&mut store);
        let air = RegionName::interior_air();
        slots
            .set_convective(
                &air,
                FLOOR_PATCH,
                &ConvectiveBoundary {
                    h_w_per_m2k: Some(3.0),
                    ambient_k: 290.0,
                    wall: None,
                },
            )
            .unwrap();
        slots
            .set_convective(
                &air,
                FLOOR_PATCH,
                &ConvectiveBoundary {
                    h_w_per_m2k: None,
                    ambient_k: 291.0,
                    wall: None,
                },
            )
            .unwrap();
        let read = slots.convective(&air, FLOOR_PATCH).unwrap().unwrap();
        assert_eq!(read.h_w_per_m2k, None);
        assert_eq!(read.ambient_k, 291.0);
    }

    #[test]
    fn carrier_geometry_reads_back_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path());
        let mut slots = BoundarySlots::new(&mut store);
        let spec = CarrierKind::Carrier.spec();
        slots.set_carrier_geometry(&spec).unwrap();
        let dims = slots.carrier_dimensions_m().unwrap().unwrap();
        assert!((dims.x - spec.length_m).abs() < 1e-12);
        assert!((dims.y - spec.width_m).abs() < 1e-12);
        assert!((dims.z - spec.height_m).abs() < 1e-12);
    }

    #[test]
    fn grid_east_unset_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path());
        let mut slots = BoundarySlots::new(&mut store);
        let air = RegionName::interior_air();
        let solar = SolarLoad {
            start_day: Some(152),
            start_hour: Some(2.0),
            local_standard_meridian: Some(2.0),
            location: LatLon::new(53.5, 9.9),
            solar_intensity_w_per_m2: 1088.0,
            extinction_coefficient: 0.205,
            grid_east: None,
        };
        slots.set_solar(&air, &solar).unwrap();
        assert_eq!(slots.grid_east(&air).unwrap(), None);
    }

    #[test]
    fn probe_locations_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path());
        let mut slots = BoundarySlots::new(&mut store);
        assert!(slots.probe_locations().unwrap().is_empty());
        let points = [Vector3::new(1.0, 0.0, 0.5), Vector3::new(2.0, 0.1, 0.5)];
        slots.set_probe_locations(&points).unwrap();
        assert_eq!(slots.probe_locations().unwrap(), points);
    }
}
