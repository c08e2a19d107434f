//! Point probes of solver output.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use nalgebra::Vector3;
use tracing::info;
use ttm_core::{RegionName, Tolerances, kelvin_to_celsius, nearly_equal, time_name};
use ttm_project::BoundarySlots;
use ttm_results::{ResultsError, TimeDir, read_table};

use crate::controller::Campaign;
use crate::error::{CampaignError, CampaignResult};
use crate::solver::{Solver, SolverStep};

/// Sampled temperatures in °C, one column per probe location.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeTable {
    pub region: RegionName,
    pub time: String,
    pub locations: Vec<Vector3<f64>>,
    pub rows: Vec<(f64, Vec<f64>)>,
    pub path: PathBuf,
}

fn parse(path: &std::path::Path, line: usize, field: &str) -> CampaignResult<f64> {
    field.parse().map_err(|_| {
        CampaignError::Results(ResultsError::Parse {
            path: path.to_path_buf(),
            line,
            what: format!("'{field}' is not a number"),
        })
    })
}

impl Campaign {
    pub fn probe_locations(&mut self) -> CampaignResult<Vec<Vector3<f64>>> {
        Ok(BoundarySlots::new(&mut self.store).probe_locations()?)
    }

    pub fn add_probe(&mut self, location: Vector3<f64>) -> CampaignResult<()> {
        let mut slots = BoundarySlots::new(&mut self.store);
        let mut locations = slots.probe_locations()?;
        if !locations.contains(&location) {
            locations.push(location);
        }
        slots.set_probe_locations(&locations)?;
        slots.flush()?;
        Ok(())
    }

    pub fn clear_probes(&mut self) -> CampaignResult<()> {
        let mut slots = BoundarySlots::new(&mut self.store);
        slots.set_probe_locations(&[])?;
        slots.flush()?;
        Ok(())
    }

    fn sample_time(&self, time_s: Option<f64>) -> CampaignResult<TimeDir> {
        let times = self.tree.reconstructed_times()?;
        let found = match time_s {
            Some(t) => times
                .into_iter()
                .find(|d| nearly_equal(d.time_s, t, Tolerances::TIME)),
            None => times.into_iter().next_back(),
        };
        found.ok_or_else(|| {
            CampaignError::configuration(match time_s {
                Some(t) => format!("no output at t={}", time_name(t)),
                None => "no output to probe".to_string(),
            })
        })
    }

    /// Sample `region` at the configured probe locations, appending
    /// `location` to them first. Defaults to the latest output time.
    pub fn probe(
        &mut self,
        solver: &mut dyn Solver,
        region: &RegionName,
        location: Option<Vector3<f64>>,
        time_s: Option<f64>,
    ) -> CampaignResult<ProbeTable> {
        if let Some(location) = location {
            self.add_probe(location)?;
        }
        let locations = self.probe_locations()?;
        if locations.is_empty() {
            return Err(CampaignError::configuration("no probe locations configured"));
        }
        self.reconstruct(solver)?;
        let time = self.sample_time(time_s)?;
        solver.run(
            &SolverStep::Sample {
                region: region.clone(),
                time: time.name.clone(),
            },
            self.tree.case_dir(),
        )?;

        let output = self
            .tree
            .post_processing_dir()
            .join("probes")
            .join(region.as_str())
            .join(&time.name)
            .join("T");
        if !output.is_file() {
            return Err(ResultsError::MissingOutput { path: output }.into());
        }
        let mut rows = Vec::new();
        for (line, cols) in read_table(&output)? {
            let Some((t, values)) = cols.split_first() else {
                continue;
            };
            let values = values
                .iter()
                .map(|v| parse(&output, line, v).map(kelvin_to_celsius))
                .collect::<CampaignResult<Vec<_>>>()?;
            rows.push((parse(&output, line, t)?, values));
        }

        let path = self.layout.probe_csv(region);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&path)?;
        for (i, p) in locations.iter().enumerate() {
            writeln!(file, "# Probe {i} ({} {} {})", p.x, p.y, p.z)?;
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);
        for (t, values) in &rows {
            let mut record = vec![time_name(*t)];
            record.extend(values.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        info!(region = %region, time = %time.name, probes = locations.len(), "probes written");

        Ok(ProbeTable {
            region: region.clone(),
            time: time.name,
            locations,
            rows,
            path,
        })
    }

    /// Probe the centre of every freight element of a cargo region.
    pub fn probe_freight(
        &mut self,
        solver: &mut dyn Solver,
        region: &RegionName,
        time_s: Option<f64>,
    ) -> CampaignResult<ProbeTable> {
        let layouts = self.def.layouts()?;
        let cargo = Self::cargo_regions(&layouts)
            .into_iter()
            .find(|r| &r.name == region)
            .ok_or_else(|| CampaignError::configuration(format!("{region} is not a cargo region")))?;
        {
            let mut slots = BoundarySlots::new(&mut self.store);
            slots.set_probe_locations(&cargo.element_positions_m)?;
            slots.flush()?;
        }
        self.probe(solver, region, None, time_s)
    }
}
