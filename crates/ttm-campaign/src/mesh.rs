//! One-time mesh build.
//!
//! The mesh is built from the cargo layout the first time a campaign runs.
//! Whether it exists is decided from the case directory, never from memory,
//! and a fingerprint of the mesh-affecting inputs is stored next to it so a
//! later edit of carrier or cargo is refused instead of running on a stale
//! mesh.

use std::fs;

use nalgebra::Vector3;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use ttm_cargo::CargoLayout;
use ttm_core::RegionName;
use ttm_project::{BoundarySlots, CampaignDef, CarrierSpec, ConfigStore};
use ttm_results::SolverTree;

use crate::error::{CampaignError, CampaignResult};
use crate::solver::{Solver, SolverStep};

pub const FINGERPRINT_FILE: &str = "mesh.sha256";

/// Clearance of the interior air seed point from the carrier walls.
const AIR_SEED_CLEARANCE_M: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshStatus {
    Built,
    Existing,
}

pub fn mesh_exists(tree: &SolverTree) -> CampaignResult<bool> {
    Ok(!tree.processor_dirs()?.is_empty() || tree.case_dir().join("constant/polyMesh").is_dir())
}

/// Hash of everything that shapes the mesh and its regions.
pub fn fingerprint(campaign: &CampaignDef) -> CampaignResult<String> {
    let inputs = serde_json::to_string(&(&campaign.carrier, &campaign.cargo))?;
    let mut hasher = Sha256::new();
    hasher.update(inputs.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Seed point of the interior air: under the ceiling in the rear corner.
pub fn air_location(carrier: &CarrierSpec) -> Vector3<f64> {
    Vector3::new(
        carrier.length_m - AIR_SEED_CLEARANCE_M,
        carrier.width_m / 2.0 - AIR_SEED_CLEARANCE_M,
        carrier.height_m - AIR_SEED_CLEARANCE_M,
    )
}

/// Write geometry, regions, properties and initial values into the store.
/// Returns every region, interior air first.
pub fn write_mesh_inputs<S: ConfigStore + ?Sized>(
    store: &mut S,
    campaign: &CampaignDef,
    layouts: &[CargoLayout],
) -> CampaignResult<Vec<RegionName>> {
    let carrier = campaign.carrier.spec();
    let air = RegionName::interior_air();
    let cargo: Vec<_> = layouts.iter().flat_map(|l| l.regions.iter()).collect();
    let cargo_names: Vec<RegionName> = cargo.iter().map(|r| r.name.clone()).collect();

    let mut slots = BoundarySlots::new(store);
    slots.set_carrier_geometry(&carrier)?;
    slots.set_background_mesh(&carrier)?;

    let mut locations = vec![(air.clone(), air_location(&carrier))];
    locations.extend(cargo.iter().map(|r| (r.name.clone(), r.position_m)));
    slots.set_locations_in_mesh(&locations)?;
    slots.set_regions(std::slice::from_ref(&air), &cargo_names)?;

    for region in &cargo {
        slots.set_thermophysical(&region.name, &region.properties()?)?;
    }
    let mut all = vec![air];
    all.extend(cargo_names);
    for region in &all {
        slots.set_initial_temperature(region, campaign.initial_temperature_k())?;
        slots.set_region_functions(region)?;
    }
    if let Some(cores) = campaign.solver.cpu_cores {
        slots.set_cpu_cores(cores)?;
    }
    slots.flush()?;
    Ok(all)
}

/// Build and, for more than one core, decompose the mesh unless the case
/// already holds one.
pub fn ensure_mesh<S, V>(
    store: &mut S,
    solver: &mut V,
    tree: &SolverTree,
    campaign: &CampaignDef,
    layouts: &[CargoLayout],
) -> CampaignResult<MeshStatus>
where
    S: ConfigStore + ?Sized,
    V: Solver + ?Sized,
{
    let current = fingerprint(campaign)?;
    let stored_path = tree.case_dir().join(FINGERPRINT_FILE);
    if mesh_exists(tree)? {
        if stored_path.is_file() {
            let stored = fs::read_to_string(&stored_path)?;
            if stored.trim() != current {
                return Err(CampaignError::configuration(
                    "carrier or cargo changed after the mesh was built; remove the case directory to rebuild",
                ));
            }
        } else {
            warn!("existing mesh has no fingerprint, recording current inputs");
            fs::write(&stored_path, &current)?;
        }
        return Ok(MeshStatus::Existing);
    }

    fs::create_dir_all(tree.case_dir())?;
    let regions = write_mesh_inputs(store, campaign, layouts)?;
    solver.run(&SolverStep::BuildMesh, tree.case_dir())?;
    if campaign.solver.cpu_cores.unwrap_or(1) > 1 {
        solver.run(&SolverStep::Decompose, tree.case_dir())?;
    }
    fs::write(&stored_path, &current)?;
    info!(regions = regions.len(), "mesh built");
    Ok(MeshStatus::Built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::path::Path;
    use ttm_project::FileConfigStore;

    #[derive(Default)]
    struct Recorder {
        steps: Vec<SolverStep>,
    }

    impl Solver for Recorder {
        fn run(&mut self, step: &SolverStep, case_dir: &Path) -> CampaignResult<()> {
            match step {
                SolverStep::BuildMesh => fs::create_dir_all(case_dir.join("constant/polyMesh"))?,
                SolverStep::Decompose => fs::create_dir_all(case_dir.join("processor0"))?,
                _ => {}
            }
            self.steps.push(step.clone());
            Ok(())
        }
    }

    #[test]
    fn fingerprint_ignores_tuning() {
        let a = fixtures::campaign();
        let mut b = a.clone();
        b.tuning.arrival_threshold_k = 0.5;
        b.solver.purge_write = true;
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
        b.carrier = ttm_project::CarrierKind::Container40;
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn inputs_cover_every_region() {
        let dir = tempfile::tempdir().unwrap();
        let campaign = fixtures::campaign();
        let layouts = campaign.layouts().unwrap();
        let mut store = FileConfigStore::new(dir.path());
        let regions = write_mesh_inputs(&mut store, &campaign, &layouts).unwrap();
        assert_eq!(regions[0], RegionName::interior_air());

        let slots = BoundarySlots::new(&mut store);
        assert_eq!(slots.regions().unwrap(), regions);
        for region in &regions {
            assert_eq!(
                slots.initial_temperature_k(region).unwrap(),
                Some(campaign.initial_temperature_k())
            );
            assert!(slots.function_enabled(&format!("wallTemperature_{region}")).unwrap());
        }
        assert!(slots.carrier_dimensions_m().unwrap().is_some());
    }

    #[test]
    fn builds_once_and_refuses_changed_cargo() {
        let dir = tempfile::tempdir().unwrap();
        let case = dir.path().join("case");
        let tree = SolverTree::new(&case);
        let mut campaign = fixtures::campaign();
        campaign.solver.cpu_cores = Some(2);
        let layouts = campaign.layouts().unwrap();
        let mut store = FileConfigStore::new(&case);
        let mut solver = Recorder::default();

        let first = ensure_mesh(&mut store, &mut solver, &tree, &campaign, &layouts).unwrap();
        assert_eq!(first, MeshStatus::Built);
        assert_eq!(solver.steps, vec![SolverStep::BuildMesh, SolverStep::Decompose]);

        let again = ensure_mesh(&mut store, &mut solver, &tree, &campaign, &layouts).unwrap();
        assert_eq!(again, MeshStatus::Existing);
        assert_eq!(solver.steps.len(), 2);

        campaign.carrier = ttm_project::CarrierKind::Carrier;
        assert!(matches!(
            ensure_mesh(&mut store, &mut solver, &tree, &campaign, &layouts),
            Err(CampaignError::Configuration { .. })
        ));
    }
}
