//! Campaign run controller.
//!
//! ```text
//! Unbuilt -> MeshBuilt -> Running(i) -> SegmentComplete(i) -> ... -> TransportComplete
//!         -> ArrivalRunning(k) -> ... -> ArrivalComplete
//! ```
//!
//! Nothing about progress is kept in memory between runs. Every run
//! re-derives where to continue from the solver's time directories, so
//! re-running after a kill converges to the same state as an
//! uninterrupted run.

use std::path::PathBuf;

use tracing::{debug, info};
use ttm_boundary::{
    AuditLog, FixedOffset, LongitudeApproximation, Segment, SynthesisContext, SynthesizedBoundary,
    Synthesizer, TimezoneResolver, WallGeometry, derive_segments, resume_index, route_duration_s,
};
use ttm_cargo::{BatteryRegion, CargoLayout};
use ttm_core::{RegionName, Tolerances, nearly_equal};
use ttm_project::{
    BoundarySlots, CampaignDef, CampaignLayout, FileConfigStore, RunControl, WeatherSample,
    WeatherSource, load_yaml, save_yaml, with_retry,
};
use ttm_results::{
    AggregateOptions, Phase, PostprocessSummary, SolverTree, discard_fragments_from, postprocess,
};

use crate::error::{CampaignError, CampaignResult};
use crate::logs;
use crate::mesh::{self, MeshStatus};
use crate::solver::{Solver, SolverStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignState {
    Unbuilt,
    MeshBuilt,
    Running(usize),
    SegmentComplete(usize),
    TransportComplete,
    ArrivalRunning(usize),
    ArrivalComplete,
}

#[derive(Debug, Clone)]
pub struct CampaignEvent {
    pub state: CampaignState,
    pub sim_time_s: f64,
    pub message: Option<String>,
}

pub(crate) fn emit(
    progress: &mut Option<&mut dyn FnMut(CampaignEvent)>,
    state: CampaignState,
    sim_time_s: f64,
    message: Option<String>,
) {
    debug!(state = ?state, sim_time_s, "campaign state");
    if let Some(cb) = progress.as_deref_mut() {
        cb(CampaignEvent {
            state,
            sim_time_s,
            message,
        });
    }
}

#[derive(Debug, Clone)]
pub struct CampaignOptions {
    /// Attempts per weather request, reconnecting in between.
    pub weather_attempts: usize,
    /// Time directories kept when purging after a segment.
    pub keep_time_dirs: usize,
}

impl Default for CampaignOptions {
    fn default() -> Self {
        Self {
            weather_attempts: 3,
            keep_time_dirs: 2,
        }
    }
}

/// Route as delivered by the weather session.
#[derive(Debug, Clone)]
pub struct Route {
    pub samples: Vec<WeatherSample>,
    pub segments: Vec<Segment>,
    pub duration_s: f64,
}

#[derive(Debug, Clone)]
pub struct TransportSummary {
    pub mesh: MeshStatus,
    pub resumed_from_s: f64,
    pub duration_s: f64,
    /// Boundaries of the segments run by this invocation, in order.
    pub boundaries: Vec<SynthesizedBoundary>,
}

pub struct Campaign {
    pub(crate) layout: CampaignLayout,
    pub(crate) def: CampaignDef,
    pub(crate) store: FileConfigStore,
    pub(crate) tree: SolverTree,
    pub(crate) options: CampaignOptions,
}

impl Campaign {
    pub fn new(layout: CampaignLayout, def: CampaignDef) -> Self {
        let case = layout.case_dir();
        Self {
            store: FileConfigStore::new(&case),
            tree: SolverTree::new(case),
            layout,
            def,
            options: CampaignOptions::default(),
        }
    }

    /// Load `<root>/campaign.yaml`.
    pub fn open(root: impl Into<PathBuf>) -> CampaignResult<Self> {
        let layout = CampaignLayout::new(root);
        let def = load_yaml(&layout.campaign_file())?;
        Ok(Self::new(layout, def))
    }

    pub fn with_options(mut self, options: CampaignOptions) -> Self {
        self.options = options;
        self
    }

    pub fn layout(&self) -> &CampaignLayout {
        &self.layout
    }

    pub fn definition(&self) -> &CampaignDef {
        &self.def
    }

    pub fn tree(&self) -> &SolverTree {
        &self.tree
    }

    pub fn store_mut(&mut self) -> &mut FileConfigStore {
        &mut self.store
    }

    pub fn weather_source(&self) -> ttm_project::CsvWeatherSource {
        ttm_project::CsvWeatherSource::new(self.layout.weather_file())
    }

    pub(crate) fn open_weather(&self, weather: &mut dyn WeatherSource) -> CampaignResult<()> {
        with_retry(weather, self.options.weather_attempts, |s| s.open())?;
        Ok(())
    }

    pub fn route(&self, weather: &mut dyn WeatherSource) -> CampaignResult<Route> {
        let samples = with_retry(weather, self.options.weather_attempts, |s| s.samples())?;
        let segments = derive_segments(&samples, self.def.carrier.is_car());
        if segments.is_empty() {
            return Err(CampaignError::configuration(
                "the route needs at least two waypoints",
            ));
        }
        Ok(Route {
            duration_s: route_duration_s(&samples),
            samples,
            segments,
        })
    }

    pub(crate) fn resolver(&self) -> Box<dyn TimezoneResolver> {
        match self.def.utc_offset_hours {
            Some(offset) => Box::new(FixedOffset(offset)),
            None => Box::new(LongitudeApproximation),
        }
    }

    pub(crate) fn cargo_regions(layouts: &[CargoLayout]) -> Vec<&BatteryRegion> {
        layouts.iter().flat_map(|l| l.regions.iter()).collect()
    }

    /// Regions every complete time directory holds during transport.
    pub(crate) fn transport_regions(&self, layouts: &[CargoLayout]) -> Vec<RegionName> {
        let mut regions = Vec::new();
        if !self.def.carrier.is_car() {
            regions.push(RegionName::interior_air());
        }
        regions.extend(Self::cargo_regions(layouts).into_iter().map(|r| r.name.clone()));
        regions
    }

    pub(crate) fn synthesizer<'r>(
        &self,
        resolver: &'r dyn TimezoneResolver,
        layouts: &[CargoLayout],
        route: &Route,
    ) -> CampaignResult<Synthesizer<'r>> {
        let border = self.def.border_region();
        let geometry = if border.is_interior_air() {
            let carrier = self.def.carrier.spec();
            WallGeometry {
                height_m: carrier.height_m,
                length_m: carrier.length_m,
            }
        } else {
            let region = Self::cargo_regions(layouts)
                .into_iter()
                .find(|r| r.name == border)
                .ok_or_else(|| {
                    CampaignError::configuration(format!("border region {border} is not in the cargo layout"))
                })?;
            WallGeometry::from_dimensions(&region.dimensions_m)
        };
        let campaign_start = route
            .samples
            .first()
            .map(|s| s.timestamp)
            .ok_or_else(|| CampaignError::configuration("the route is empty"))?;
        let context = SynthesisContext {
            border_region: border,
            geometry,
            initial_temperature_k: self.def.initial_temperature_k(),
            speed_threshold_mps: self.def.tuning.speed_threshold_mps,
            coefficient_floor_w_per_m2k: self.def.tuning.coefficient_floor_w_per_m2k,
            campaign_start,
        };
        Ok(Synthesizer::new(
            context,
            resolver,
            AuditLog::new(self.layout.speed_log()),
            AuditLog::new(self.layout.coefficient_log()),
        ))
    }

    /// Drop the interior air from the region list and its function objects.
    pub(crate) fn remove_interior_air(&mut self) -> CampaignResult<()> {
        let air = RegionName::interior_air();
        let mut slots = BoundarySlots::new(&mut self.store);
        if !slots.regions()?.contains(&air) {
            return Ok(());
        }
        slots.remove_fluid_regions()?;
        slots.disable_region_functions(&air)?;
        slots.flush()?;
        info!("interior air region removed");
        Ok(())
    }

    pub(crate) fn set_run_control(&mut self, control: &RunControl) -> CampaignResult<()> {
        let mut slots = BoundarySlots::new(&mut self.store);
        slots.set_run_control(control)?;
        slots.flush()?;
        Ok(())
    }

    /// One solver invocation from the latest time to `control.end_time_s`.
    pub(crate) fn advance(
        &mut self,
        solver: &mut dyn Solver,
        control: &RunControl,
        expected: &[RegionName],
    ) -> CampaignResult<()> {
        let from_s = self.tree.latest_time_s()?;
        self.set_run_control(control)?;
        solver.run(&SolverStep::ApplyBoundaries, self.tree.case_dir())?;
        solver.run(&SolverStep::Advance, self.tree.case_dir())?;

        let did_not_advance = CampaignError::SolverDidNotAdvance {
            from_s,
            to_s: control.end_time_s,
        };
        let Some(latest) = self.tree.latest()? else {
            return Err(did_not_advance);
        };
        let reached = latest.time_s > control.end_time_s
            || nearly_equal(latest.time_s, control.end_time_s, Tolerances::TIME);
        if !reached || !self.tree.is_complete(&latest, expected)? {
            return Err(did_not_advance);
        }
        Ok(())
    }

    pub(crate) fn purge_if_enabled(&self) -> CampaignResult<()> {
        if !self.def.solver.purge_write {
            return Ok(());
        }
        let removed = self.tree.purge(self.options.keep_time_dirs)?;
        if !removed.is_empty() {
            info!(removed = ?removed, "purged old time directories");
        }
        Ok(())
    }

    /// Run every remaining transport segment.
    pub fn run_transport(
        &mut self,
        solver: &mut dyn Solver,
        weather: &mut dyn WeatherSource,
        progress: Option<&mut dyn FnMut(CampaignEvent)>,
    ) -> CampaignResult<TransportSummary> {
        self.open_weather(weather)?;
        let result = self.transport(solver, weather, progress);
        weather.close();
        result
    }

    fn transport(
        &mut self,
        solver: &mut dyn Solver,
        weather: &mut dyn WeatherSource,
        mut progress: Option<&mut dyn FnMut(CampaignEvent)>,
    ) -> CampaignResult<TransportSummary> {
        self.layout.ensure_dirs()?;
        emit(&mut progress, CampaignState::Unbuilt, 0.0, None);

        let layouts = self.def.layouts()?;
        let mesh = mesh::ensure_mesh(&mut self.store, solver, &self.tree, &self.def, &layouts)?;
        emit(
            &mut progress,
            CampaignState::MeshBuilt,
            0.0,
            Some(format!("{mesh:?}")),
        );

        let route = self.route(weather)?;
        if self.def.carrier.is_car() {
            self.remove_interior_air()?;
        }
        let expected = self.transport_regions(&layouts);
        let resumed_from_s = self.tree.discard_incomplete(&expected)?;

        let Some(first) = resume_index(&route.segments, resumed_from_s) else {
            info!(sim_time_s = resumed_from_s, "transport already complete");
            emit(
                &mut progress,
                CampaignState::TransportComplete,
                resumed_from_s,
                None,
            );
            return Ok(TransportSummary {
                mesh,
                resumed_from_s,
                duration_s: route.duration_s,
                boundaries: Vec::new(),
            });
        };
        if resumed_from_s > 0.0 {
            info!(
                sim_time_s = resumed_from_s,
                segment = first,
                "resuming transport"
            );
        }

        let resolver = self.resolver();
        let synth = self.synthesizer(resolver.as_ref(), &layouts, &route)?;
        discard_fragments_from(&self.tree.post_processing_dir(), resumed_from_s)?;
        synth.rewind_logs(route.segments[first].start_s)?;

        let mut boundaries = Vec::new();
        for segment in &route.segments[first..] {
            emit(
                &mut progress,
                CampaignState::Running(segment.index),
                segment.start_s,
                Some(segment.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            );
            let boundary = synth.synthesize(&mut self.store, &self.tree, segment)?;
            let control = RunControl::for_interval(segment.start_s, segment.duration_s());
            self.advance(solver, &control, &expected)?;
            logs::archive_solver_log(
                self.tree.case_dir(),
                &self.layout.logs_dir(),
                &self.def.solver.solver_log,
                segment.timestamp,
            )?;
            self.purge_if_enabled()?;
            emit(
                &mut progress,
                CampaignState::SegmentComplete(segment.index),
                segment.end_s,
                None,
            );
            boundaries.push(boundary);
        }

        logs::collect_logs(self.tree.case_dir(), &self.layout.logs_dir())?;
        info!(segments = boundaries.len(), "transport complete");
        emit(
            &mut progress,
            CampaignState::TransportComplete,
            route.duration_s,
            None,
        );
        Ok(TransportSummary {
            mesh,
            resumed_from_s,
            duration_s: route.duration_s,
            boundaries,
        })
    }

    /// Change the decomposition. Refused once the case is decomposed for a
    /// different count.
    pub fn set_cpu_cores(&mut self, cores: usize) -> CampaignResult<()> {
        if cores == 0 {
            return Err(CampaignError::configuration("cpu cores must be at least 1"));
        }
        let mut slots = BoundarySlots::new(&mut self.store);
        if self.tree.is_decomposed() {
            let current = match slots.cpu_cores()? {
                Some(n) => n,
                None => self.tree.processor_dirs()?.len(),
            };
            if current != cores {
                return Err(CampaignError::configuration(format!(
                    "case is decomposed for {current} cores, cannot switch to {cores}"
                )));
            }
        }
        slots.set_cpu_cores(cores)?;
        slots.flush()?;
        self.def.solver.cpu_cores = Some(cores);
        save_yaml(&self.layout.campaign_file(), &self.def)?;
        info!(cores, "cpu cores set");
        Ok(())
    }

    /// Reconstruct the latest decomposed time unless the case already has it.
    pub fn reconstruct(&mut self, solver: &mut dyn Solver) -> CampaignResult<bool> {
        if !self.tree.is_decomposed() {
            return Ok(false);
        }
        let Some(latest) = self.tree.latest()? else {
            return Ok(false);
        };
        let done = self
            .tree
            .reconstructed_times()?
            .iter()
            .any(|t| nearly_equal(t.time_s, latest.time_s, Tolerances::TIME));
        if done {
            debug!(time = %latest.name, "latest time already reconstructed");
            return Ok(false);
        }
        solver.run(&SolverStep::Reconstruct, self.tree.case_dir())?;
        info!(time = %latest.name, "reconstructed");
        Ok(true)
    }

    /// Aggregate one phase into the campaign's postprocessing tables.
    pub fn postprocess(
        &self,
        weather: &mut dyn WeatherSource,
        phase: Phase,
    ) -> CampaignResult<PostprocessSummary> {
        self.open_weather(weather)?;
        let route = self.route(weather);
        weather.close();
        let route = route?;

        let layouts = self.def.layouts()?;
        let regions = self.transport_regions(&layouts);
        let opts = AggregateOptions {
            phase,
            duration_s: route.duration_s,
            initial_temperature_k: self.def.initial_temperature_k(),
            pruned: self.def.solver.purge_write,
        };
        self.layout.ensure_dirs()?;
        let heat_flux_dir = self.layout.wall_heat_flux_dir();
        let (series_dir, heat_flux) = match phase {
            Phase::Transport => (self.layout.temperature_dir(), Some(heat_flux_dir.as_path())),
            Phase::Arrival => (self.layout.arrival_dir(), None),
        };
        if self.def.solver.purge_write {
            debug!("time directories were purged, fragments are accepted without time matching");
        }
        Ok(postprocess(&self.tree, &regions, &opts, &series_dir, heat_flux)?)
    }
}
