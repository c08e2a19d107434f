//! Deterministic stand-in for the CFD solver.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use ttm_campaign::{CampaignResult, Solver, SolverStep};
use ttm_core::{RegionName, time_name};
use ttm_project::slots::{CARRIER_PATCH, cargo_patch};
use ttm_project::{BoundarySlots, FileConfigStore};
use ttm_results::{Metric, SolverTree, value_at};

/// Offset of every region below the ambient it sees, in fixed mode.
pub const WALL_OFFSET_K: f64 = 5.0;

#[derive(Default)]
pub struct StubSolver {
    pub steps: Vec<SolverStep>,
    /// Fraction of the distance to ambient left after each invocation;
    /// `None` pins every region at ambient - 5 K.
    pub relaxation: Option<f64>,
    /// Exit without writing anything on `Advance`.
    pub stall: bool,
    /// Temperature reported by every probe, K.
    pub probe_k: f64,
}

impl StubSolver {
    pub fn relaxing(fraction: f64) -> Self {
        Self {
            relaxation: Some(fraction),
            ..Self::default()
        }
    }

    pub fn advances(&self) -> usize {
        self.steps.iter().filter(|s| **s == SolverStep::Advance).count()
    }

    fn build_mesh(&self, case: &Path) -> CampaignResult<()> {
        fs::create_dir_all(case.join("constant/polyMesh"))?;
        let mut store = FileConfigStore::new(case);
        let slots = BoundarySlots::new(&mut store);
        for region in slots.regions()? {
            fs::create_dir_all(case.join("0").join(region.as_str()))?;
        }
        Ok(())
    }

    fn advance(&self, case: &Path) -> CampaignResult<()> {
        let mut store = FileConfigStore::new(case);
        let slots = BoundarySlots::new(&mut store);
        let Some(control) = slots.run_control()? else {
            panic!("run control not configured");
        };
        let tree = SolverTree::new(case);
        let pp = tree.post_processing_dir();
        let start = tree.latest_time_s()?;
        let end = control.end_time_s;
        let (start_name, end_name) = (time_name(start), time_name(end));
        let mid = (start + end) / 2.0;

        let regions = slots.regions()?;
        let air = RegionName::interior_air();
        let air_ambient = slots.convective(&air, CARRIER_PATCH)?.map(|b| b.ambient_k);
        for region in &regions {
            let ambient = slots
                .convective(region, &cargo_patch(region))?
                .map(|b| b.ambient_k)
                .or(air_ambient)
                .unwrap_or_else(|| panic!("no ambient for {region}"));
            let (average, min, max) = match self.relaxation {
                None => (
                    ambient - WALL_OFFSET_K,
                    ambient - WALL_OFFSET_K - 1.0,
                    ambient - WALL_OFFSET_K + 1.0,
                ),
                Some(fraction) => {
                    let previous = match value_at(&pp, region, Metric::Average, start)? {
                        Some(t) => t,
                        None => slots.initial_temperature_k(region)?.unwrap_or(293.15),
                    };
                    let t = ambient + (previous - ambient) * fraction;
                    (t, t, t)
                }
            };
            fs::create_dir_all(case.join(&end_name).join(region.as_str()))?;
            for (metric, value) in [
                (Metric::Average, average),
                (Metric::Min, min),
                (Metric::Max, max),
                (Metric::WallTemperature, average),
            ] {
                let file = match metric {
                    Metric::WallTemperature => "surfaceFieldValue.dat",
                    _ => "volFieldValue.dat",
                };
                let dir = metric.family_dir(&pp, region).join(&start_name);
                fs::create_dir_all(&dir)?;
                fs::write(
                    dir.join(file),
                    format!("# Time {metric}(T)\n{mid} {value}\n{end} {value}\n"),
                )?;
            }
        }
        if regions.contains(&air) {
            let dir = pp.join(air.as_str()).join("wallHeatFlux").join(&start_name);
            fs::create_dir_all(&dir)?;
            fs::write(
                dir.join("wallHeatFlux.dat"),
                format!("# Time patch min max Q\n{end} carrier 1 2 10\n{end} bottom 1 2 -3\n"),
            )?;
        }
        fs::write(case.join("log.chtMultiRegionFoam"), format!("advanced to {end}\n"))?;
        Ok(())
    }

    fn sample(&self, case: &Path, region: &RegionName, time: &str) -> CampaignResult<()> {
        let mut store = FileConfigStore::new(case);
        let locations = BoundarySlots::new(&mut store).probe_locations()?;
        let dir = case.join("postProcessing/probes").join(region.as_str()).join(time);
        fs::create_dir_all(&dir)?;
        let mut out = String::new();
        for (i, p) in locations.iter().enumerate() {
            out.push_str(&format!("# Probe {i} ({} {} {})\n", p.x, p.y, p.z));
        }
        out.push_str("#       Time\n");
        out.push_str(time);
        for _ in &locations {
            out.push_str(&format!(" {}", self.probe_k));
        }
        out.push('\n');
        fs::write(dir.join("T"), out)?;
        Ok(())
    }
}

impl Solver for StubSolver {
    fn run(&mut self, step: &SolverStep, case_dir: &Path) -> CampaignResult<()> {
        self.steps.push(step.clone());
        match step {
            SolverStep::BuildMesh => self.build_mesh(case_dir),
            SolverStep::Advance if self.stall => Ok(()),
            SolverStep::Advance => self.advance(case_dir),
            SolverStep::Sample { region, time } => self.sample(case_dir, region, time),
            SolverStep::Reconstruct => {
                let tree = SolverTree::new(case_dir);
                if let Some(latest) = tree.latest()? {
                    fs::create_dir_all(case_dir.join(&latest.name))?;
                }
                Ok(())
            }
            SolverStep::Decompose | SolverStep::ApplyBoundaries => Ok(()),
        }
    }
}

pub const CONTAINER: &str = r#"
version: 1
name: stub campaign
carrier: container
initial_temperature_c: 20.0
arrival_temperature_c: 25.0
cargo:
  - type: pallet
    template: pallet1x1
    position_m: [1.0, 0.0, 0.1]
    freight:
      type: modules
      dimensions_m: [0.2, 0.2, 0.2]
      weight_kg: 8.0
"#;

pub const CAR: &str = r#"
version: 1
name: car campaign
carrier: car
initial_temperature_c: 20.0
cargo:
  - type: car
    template: batterypack
    freight:
      type: modules
      dimensions_m: [0.2, 0.2, 0.1]
      weight_kg: 4.0
"#;

/// Hourly waypoints a few hundred meters apart with the given ambient
/// temperatures in K.
pub fn weather_csv(ambient_k: &[f64]) -> String {
    let mut csv = String::from("Date,Lat,Lon,T\n");
    for (i, t) in ambient_k.iter().enumerate() {
        csv.push_str(&format!(
            "2021-06-01 {:02}:00:00,53.5,{:.3},{}\n",
            i,
            9.9 + 0.005 * i as f64,
            t - 273.15
        ));
    }
    csv
}

/// Campaign directory with `campaign.yaml` and `weatherdata.csv`.
pub fn campaign_dir(root: &Path, yaml: &str, ambient_k: &[f64]) -> PathBuf {
    fs::create_dir_all(root).unwrap();
    fs::write(root.join("campaign.yaml"), yaml).unwrap();
    fs::write(root.join("weatherdata.csv"), weather_csv(ambient_k)).unwrap();
    root.to_path_buf()
}
