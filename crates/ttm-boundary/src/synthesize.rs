//! Per-segment boundary synthesis.

use chrono::{DateTime, Utc};
use tracing::info;
use ttm_convection::{ConvectionInput, heat_transfer_coefficient};
use ttm_core::units::{k, m, mps};
use ttm_core::RegionName;
use ttm_project::slots::{CARRIER_PATCH, FLOOR_PATCH, cargo_patch};
use ttm_project::{BoundarySlots, ConfigStore, ConvectiveBoundary, SolarLoad};
use ttm_results::SolverTree;

use crate::BoundaryResult;
use crate::audit::AuditLog;
use crate::coefficient::{Coefficient, WallGeometry, plausible_coefficient};
use crate::segments::Segment;
use crate::solar::{TimezoneResolver, solar_load};
use crate::wall::prior_wall_temperature;

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisContext {
    /// Region whose outer wall faces the ambient air.
    pub border_region: RegionName,
    pub geometry: WallGeometry,
    pub initial_temperature_k: f64,
    pub speed_threshold_mps: f64,
    pub coefficient_floor_w_per_m2k: f64,
    /// UTC time of the first waypoint.
    pub campaign_start: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedBoundary {
    pub segment_index: usize,
    pub start_s: f64,
    pub ambient_k: f64,
    pub speed_mps: f64,
    pub wall_temperature_k: f64,
    pub coefficient: Coefficient,
    pub solar: SolarLoad,
}

pub struct Synthesizer<'a> {
    context: SynthesisContext,
    resolver: &'a dyn TimezoneResolver,
    speed_log: AuditLog,
    coefficient_log: AuditLog,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        context: SynthesisContext,
        resolver: &'a dyn TimezoneResolver,
        speed_log: AuditLog,
        coefficient_log: AuditLog,
    ) -> Self {
        Self {
            context,
            resolver,
            speed_log,
            coefficient_log,
        }
    }

    pub fn context(&self) -> &SynthesisContext {
        &self.context
    }

    pub fn coefficient_log(&self) -> &AuditLog {
        &self.coefficient_log
    }

    pub fn speed_log(&self) -> &AuditLog {
        &self.speed_log
    }

    /// Forget audit rows of segments that will be re-run.
    pub fn rewind_logs(&self, from_s: f64) -> BoundaryResult<()> {
        self.speed_log.rewind(from_s)?;
        self.coefficient_log.rewind(from_s)?;
        Ok(())
    }

    /// Screened coefficient for the outer wall of `region`; also returns the
    /// wall temperature it was evaluated at.
    pub fn coefficient(
        &self,
        tree: &SolverTree,
        region: &RegionName,
        geometry: WallGeometry,
        ambient_k: f64,
        speed_mps: f64,
    ) -> BoundaryResult<(f64, Coefficient)> {
        let wall_k = prior_wall_temperature(tree, region, self.context.initial_temperature_k)?;
        let input = ConvectionInput {
            height: m(geometry.height_m),
            length: m(geometry.length_m),
            t_wall: k(wall_k),
            t_ambient: k(ambient_k),
            velocity: mps(speed_mps),
        };
        let outcome = heat_transfer_coefficient(&input, mps(self.context.speed_threshold_mps))?;
        let last_good = self.coefficient_log.last_value()?;
        Ok((
            wall_k,
            plausible_coefficient(&outcome, self.context.coefficient_floor_w_per_m2k, last_good),
        ))
    }

    /// Derive and write the border region's boundary for `segment`, then
    /// append speed and coefficient to the audit logs.
    pub fn synthesize<S: ConfigStore + ?Sized>(
        &self,
        store: &mut S,
        tree: &SolverTree,
        segment: &Segment,
    ) -> BoundaryResult<SynthesizedBoundary> {
        let border = &self.context.border_region;
        let (wall_k, coefficient) = self.coefficient(
            tree,
            border,
            self.context.geometry,
            segment.ambient_k,
            segment.speed_mps,
        )?;
        let solar = solar_load(self.context.campaign_start, segment, self.resolver);

        let mut slots = BoundarySlots::new(store);
        let convective = ConvectiveBoundary {
            h_w_per_m2k: Some(coefficient.value_w_per_m2k),
            ambient_k: segment.ambient_k,
            wall: None,
        };
        if border.is_interior_air() {
            slots.set_convective(border, CARRIER_PATCH, &convective)?;
            slots.set_convective(
                border,
                FLOOR_PATCH,
                &ConvectiveBoundary {
                    h_w_per_m2k: None,
                    ..convective
                },
            )?;
        } else {
            slots.set_convective(border, &cargo_patch(border), &convective)?;
        }
        slots.set_solar(border, &solar)?;
        slots.flush()?;

        self.speed_log.append(segment.start_s, segment.speed_mps)?;
        self.coefficient_log
            .append(segment.start_s, coefficient.value_w_per_m2k)?;

        info!(
            segment = segment.index,
            timestamp = %segment.timestamp.format("%Y-%m-%d %H:%M:%S"),
            lat = segment.from.lat_deg,
            lon = segment.from.lon_deg,
            ambient_k = segment.ambient_k,
            speed_mps = segment.speed_mps,
            h = coefficient.value_w_per_m2k,
            regime = ?coefficient.regime,
            wall_k,
            "boundary synthesized"
        );

        Ok(SynthesizedBoundary {
            segment_index: segment.index,
            start_s: segment.start_s,
            ambient_k: segment.ambient_k,
            speed_mps: segment.speed_mps,
            wall_temperature_k: wall_k,
            coefficient,
            solar,
        })
    }
}
