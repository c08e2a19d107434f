//! Arrival phase: the cargo leaves the carrier and relaxes to the ambient
//! temperature at the destination.

use chrono::Duration;
use tracing::{info, warn};
use ttm_boundary::{AuditLog, Synthesizer, WallGeometry};
use ttm_cargo::{BatteryRegion, PACKAGING};
use ttm_core::{RegionName, Tolerances, kelvin_to_celsius, nearly_equal};
use ttm_project::slots::cargo_patch;
use ttm_project::{BoundarySlots, ConvectiveBoundary, RunControl, WallLayer, WeatherSource};
use ttm_results::{Metric, discard_fragments_from, value_at};

use crate::controller::{Campaign, CampaignEvent, CampaignState, emit};
use crate::error::{CampaignError, CampaignResult};
use crate::logs;
use crate::solver::Solver;

#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalSummary {
    pub ambient_k: f64,
    /// Chunks run by this invocation.
    pub chunks_run: usize,
    /// Largest distance of any cargo extreme from ambient at the end.
    pub deviation_k: f64,
    pub converged: bool,
}

impl Campaign {
    /// Largest |T - ambient| over every cargo minimum and maximum at
    /// `at_s`, with the temperature it was found at.
    fn cargo_deviation(
        &self,
        regions: &[RegionName],
        ambient_k: f64,
        at_s: f64,
    ) -> CampaignResult<(f64, f64)> {
        let pp = self.tree.post_processing_dir();
        let mut extreme: Option<(f64, f64)> = None;
        for region in regions {
            for metric in [Metric::Min, Metric::Max] {
                let Some(t) = value_at(&pp, region, metric, at_s)? else {
                    continue;
                };
                let deviation = (t - ambient_k).abs();
                if extreme.is_none_or(|(d, _)| deviation > d) {
                    extreme = Some((deviation, t));
                }
            }
        }
        let initial = self.def.initial_temperature_k();
        Ok(extreme.unwrap_or(((initial - ambient_k).abs(), initial)))
    }

    /// Open-air natural convection on the outer wall of every cargo region.
    fn apply_arrival_boundaries(
        &mut self,
        synth: &Synthesizer<'_>,
        cargo: &[&BatteryRegion],
        ambient_k: f64,
    ) -> CampaignResult<()> {
        let mut slots = BoundarySlots::new(&mut self.store);
        for region in cargo {
            let geometry = WallGeometry::from_dimensions(&region.dimensions_m);
            let (wall_k, coefficient) =
                synth.coefficient(&self.tree, &region.name, geometry, ambient_k, 0.0)?;
            let boundary = ConvectiveBoundary {
                h_w_per_m2k: Some(coefficient.value_w_per_m2k),
                ambient_k,
                wall: Some(WallLayer {
                    conductivity_w_per_mk: PACKAGING.conductivity_w_per_mk,
                    thickness_m: region.packaging_thickness_m()?,
                }),
            };
            slots.set_convective(&region.name, &cargo_patch(&region.name), &boundary)?;
            slots.clear_initial_temperature(&region.name)?;
            info!(
                region = %region.name,
                wall_k,
                h = coefficient.value_w_per_m2k,
                "arrival boundary"
            );
        }
        slots.flush()?;
        Ok(())
    }

    /// Run arrival chunks until every cargo extreme is within the arrival
    /// threshold of ambient or the chunk limit is reached.
    pub fn run_arrival(
        &mut self,
        solver: &mut dyn Solver,
        weather: &mut dyn WeatherSource,
        progress: Option<&mut dyn FnMut(CampaignEvent)>,
    ) -> CampaignResult<ArrivalSummary> {
        self.open_weather(weather)?;
        let result = self.arrival(solver, weather, progress);
        weather.close();
        result
    }

    fn arrival(
        &mut self,
        solver: &mut dyn Solver,
        weather: &mut dyn WeatherSource,
        mut progress: Option<&mut dyn FnMut(CampaignEvent)>,
    ) -> CampaignResult<ArrivalSummary> {
        let route = self.route(weather)?;
        let layouts = self.def.layouts()?;
        let cargo = Self::cargo_regions(&layouts);
        let names: Vec<RegionName> = cargo.iter().map(|r| r.name.clone()).collect();

        let resumed_s = self.tree.discard_incomplete(&names)?;
        let transported = resumed_s > route.duration_s
            || nearly_equal(resumed_s, route.duration_s, Tolerances::TIME);
        if !transported {
            return Err(CampaignError::configuration(format!(
                "transport has reached t={resumed_s} s of {} s",
                route.duration_s
            )));
        }
        let ambient_k = match self.def.arrival_temperature_k() {
            Some(t) => t,
            None => route
                .samples
                .last()
                .map(|s| s.ambient_k())
                .ok_or_else(|| CampaignError::configuration("the route is empty"))?,
        };
        emit(
            &mut progress,
            CampaignState::TransportComplete,
            resumed_s,
            None,
        );

        self.layout.ensure_dirs()?;
        self.remove_interior_air()?;
        discard_fragments_from(&self.tree.post_processing_dir(), resumed_s)?;

        let record = AuditLog::new(self.layout.arrival_record());
        let elapsed_s = resumed_s - route.duration_s;
        record.rewind(elapsed_s)?;
        let (mut deviation_k, extreme_k) = self.cargo_deviation(&names, ambient_k, resumed_s)?;
        if elapsed_s > 0.0 {
            record.append(elapsed_s, kelvin_to_celsius(extreme_k))?;
        }

        let resolver = self.resolver();
        let synth = self.synthesizer(resolver.as_ref(), &layouts, &route)?;
        let tuning = self.def.tuning;
        let mut chunk = (elapsed_s / tuning.arrival_chunk_s).round() as usize;
        let mut chunks_run = 0;
        let arrived_at = route
            .samples
            .last()
            .map(|s| s.timestamp)
            .ok_or_else(|| CampaignError::configuration("the route is empty"))?;

        let converged = loop {
            if deviation_k <= tuning.arrival_threshold_k {
                break true;
            }
            if chunk >= tuning.max_arrival_chunks {
                warn!(
                    chunks = chunk,
                    deviation_k, "arrival chunk limit reached before convergence"
                );
                break false;
            }
            let start_s = self.tree.latest_time_s()?;
            emit(
                &mut progress,
                CampaignState::ArrivalRunning(chunk),
                start_s,
                Some(format!("deviation {deviation_k:.3} K")),
            );
            self.apply_arrival_boundaries(&synth, &cargo, ambient_k)?;
            let control = RunControl::for_interval(start_s, tuning.arrival_chunk_s);
            self.advance(solver, &control, &names)?;
            let stamp = arrived_at
                + Duration::milliseconds(((start_s - route.duration_s) * 1000.0).round() as i64);
            logs::archive_solver_log(
                self.tree.case_dir(),
                &self.layout.logs_dir(),
                &self.def.solver.solver_log,
                stamp,
            )?;
            self.purge_if_enabled()?;

            let end_s = self.tree.latest_time_s()?;
            let (deviation, extreme) = self.cargo_deviation(&names, ambient_k, end_s)?;
            deviation_k = deviation;
            record.append(end_s - route.duration_s, kelvin_to_celsius(extreme))?;
            info!(chunk, deviation_k, "arrival chunk finished");
            chunk += 1;
            chunks_run += 1;
        };

        logs::collect_logs(self.tree.case_dir(), &self.layout.logs_dir())?;
        let end_s = self.tree.latest_time_s()?;
        emit(
            &mut progress,
            CampaignState::ArrivalComplete,
            end_s,
            Some(if converged { "converged" } else { "chunk limit reached" }.to_string()),
        );
        info!(converged, deviation_k, chunks_run, "arrival complete");
        Ok(ArrivalSummary {
            ambient_k,
            chunks_run,
            deviation_k,
            converged,
        })
    }
}
