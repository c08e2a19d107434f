//! Stitching restart fragments into continuous time series.
//!
//! Transport and arrival are aggregated independently. Transport
//! fragments are those restarted before the route duration, arrival
//! fragments those restarted at or after it. Every series starts with a
//! synthetic row at the phase start holding the phase's initial value;
//! fragment rows at or before the phase start are discarded. Where
//! adjacent fragments claim the same timestamp the later fragment wins.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};
use ttm_core::{RegionName, Tolerances, kelvin_to_celsius, nearly_equal};

use crate::fragments::{
    Fragment, Metric, list_fragments, parse_number, read_table, restart_dirs, time_key,
};
use crate::timedirs::{SolverTree, TimeDir};
use crate::types::{HeatFluxRow, RegionTimeSeries, SeriesRow, write_heat_flux_csv};
use crate::{ResultsError, ResultsResult};

/// Patch whose heat flux is reported as written; all others are negated.
pub const CARRIER_PATCH: &str = "carrier";
pub const CARGO_SERIES: &str = "cargo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Transport,
    Arrival,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateOptions {
    pub phase: Phase,
    /// Route duration in simulated seconds.
    pub duration_s: f64,
    pub initial_temperature_k: f64,
    /// Time directories were purged during the run, so restart directories
    /// cannot be matched against the time list.
    pub pruned: bool,
}

impl AggregateOptions {
    fn with_phase(&self, phase: Phase) -> Self {
        Self { phase, ..*self }
    }

    fn start_s(&self) -> f64 {
        match self.phase {
            Phase::Transport => 0.0,
            Phase::Arrival => self.duration_s,
        }
    }

    fn in_phase(&self, t: f64) -> bool {
        let at_or_after_end = t > self.duration_s || nearly_equal(t, self.duration_s, Tolerances::TIME);
        match self.phase {
            Phase::Transport => t < self.duration_s || nearly_equal(t, self.duration_s, Tolerances::TIME),
            Phase::Arrival => at_or_after_end,
        }
    }

    fn restart_in_phase(&self, restart_s: f64) -> bool {
        let before_end = restart_s < self.duration_s && !nearly_equal(restart_s, self.duration_s, Tolerances::TIME);
        match self.phase {
            Phase::Transport => before_end,
            Phase::Arrival => !before_end,
        }
    }
}

fn phase_times(tree: &SolverTree, opts: &AggregateOptions) -> ResultsResult<Vec<TimeDir>> {
    let times: Vec<TimeDir> = tree
        .times()?
        .into_iter()
        .filter(|t| opts.in_phase(t.time_s))
        .collect();
    if times.is_empty() {
        return Err(ResultsError::NoTimes);
    }
    Ok(times)
}

/// Restarts that belong to the phase and have finished.
fn accepted(fragments: Vec<Fragment>, times: &[TimeDir], opts: &AggregateOptions) -> Vec<Fragment> {
    let latest = times.last().map_or(0.0, |t| t.time_s);
    fragments
        .into_iter()
        .filter(|f| {
            let r = f.restart.time_s;
            opts.restart_in_phase(r)
                && r < latest
                && !nearly_equal(r, latest, Tolerances::TIME)
                && (opts.pruned || times.iter().any(|t| time_key(t.time_s) == time_key(r)))
        })
        .collect()
}

/// Concatenate rows after a synthetic row zero, clip to the phase and
/// de-duplicate timestamps keeping the later fragment's value.
pub(crate) fn stitch(
    fragments: &[Vec<(f64, f64)>],
    start_s: f64,
    end_s: Option<f64>,
    row_zero: f64,
) -> Vec<(f64, f64)> {
    let mut rows = vec![(start_s, row_zero)];
    for fragment in fragments {
        rows.extend(fragment.iter().copied().filter(|(t, _)| {
            time_key(*t) > time_key(start_s) && end_s.is_none_or(|end| time_key(*t) <= time_key(end))
        }));
    }
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(rows.len());
    for row in rows {
        match out.last_mut() {
            Some(last) if time_key(last.0) == time_key(row.0) => *last = row,
            _ => out.push(row),
        }
    }
    out
}

/// Stitched series of one metric in Kelvin, or `None` when the region
/// never had this function object.
fn metric_series(
    tree: &SolverTree,
    region: &RegionName,
    metric: Metric,
    opts: &AggregateOptions,
) -> ResultsResult<Option<Vec<(f64, f64)>>> {
    let pp = tree.post_processing_dir();
    if !metric.family_dir(&pp, region).is_dir() {
        return Ok(None);
    }
    let times = phase_times(tree, opts)?;
    let fragments = accepted(list_fragments(&pp, region, metric)?, &times, opts);
    if fragments.is_empty() {
        return Err(ResultsError::NoFragments {
            region: region.to_string(),
            metric: metric.to_string(),
        });
    }
    let row_zero = match opts.phase {
        Phase::Transport => opts.initial_temperature_k,
        Phase::Arrival => {
            let transport = metric_series(tree, region, metric, &opts.with_phase(Phase::Transport))?;
            transport
                .and_then(|rows| rows.last().map(|(_, v)| *v))
                .unwrap_or(opts.initial_temperature_k)
        }
    };
    let end = match opts.phase {
        Phase::Transport => Some(opts.duration_s),
        Phase::Arrival => None,
    };
    let rows: Vec<Vec<(f64, f64)>> = fragments.into_iter().map(|f| f.rows).collect();
    Ok(Some(stitch(&rows, opts.start_s(), end, row_zero)))
}

/// Outer-join every metric of one region into one table in °C.
pub fn aggregate_region(
    tree: &SolverTree,
    region: &RegionName,
    opts: &AggregateOptions,
) -> ResultsResult<RegionTimeSeries> {
    let mut columns = Vec::new();
    let mut joined: BTreeMap<i64, (f64, Vec<Option<f64>>)> = BTreeMap::new();
    for metric in Metric::ALL {
        let Some(series) = metric_series(tree, region, metric, opts)? else {
            continue;
        };
        let index = columns.len();
        columns.push(metric);
        for row in joined.values_mut() {
            row.1.push(None);
        }
        for (t, v) in series {
            let entry = joined
                .entry(time_key(t))
                .or_insert_with(|| (t, vec![None; index + 1]));
            entry.1[index] = Some(kelvin_to_celsius(v));
        }
    }
    if columns.is_empty() {
        return Err(ResultsError::NoFragments {
            region: region.to_string(),
            metric: "any".to_string(),
        });
    }
    let rows = joined
        .into_values()
        .map(|(time_s, values)| SeriesRow { time_s, values })
        .collect();
    Ok(RegionTimeSeries {
        name: region.to_string(),
        columns,
        rows,
    })
}

/// Mean over the cargo regions at the timestamps they all share.
pub fn cargo_series(series: &[RegionTimeSeries]) -> Option<RegionTimeSeries> {
    let cargo: Vec<&RegionTimeSeries> = series
        .iter()
        .filter(|s| s.name.starts_with("battery"))
        .collect();
    let first = cargo.first()?;
    let columns = vec![Metric::Average, Metric::Min, Metric::Max];

    let lookup: Vec<BTreeMap<i64, &SeriesRow>> = cargo
        .iter()
        .map(|s| s.rows.iter().map(|r| (time_key(r.time_s), r)).collect())
        .collect();

    let mut rows = Vec::new();
    for row in &first.rows {
        let key = time_key(row.time_s);
        let Some(matching) = lookup.iter().map(|m| m.get(&key)).collect::<Option<Vec<_>>>() else {
            continue;
        };
        let values = columns
            .iter()
            .map(|metric| {
                let present: Vec<f64> = cargo
                    .iter()
                    .zip(&matching)
                    .filter_map(|(s, r)| s.column_index(*metric).and_then(|i| r.values[i]))
                    .collect();
                (!present.is_empty()).then(|| present.iter().sum::<f64>() / present.len() as f64)
            })
            .collect();
        rows.push(SeriesRow {
            time_s: row.time_s,
            values,
        });
    }
    Some(RegionTimeSeries {
        name: CARGO_SERIES.to_string(),
        columns,
        rows,
    })
}

/// Interior-air wall heat flux split per patch, transport phase only.
pub fn wall_heat_flux(
    tree: &SolverTree,
    opts: &AggregateOptions,
) -> ResultsResult<BTreeMap<String, Vec<HeatFluxRow>>> {
    let opts = opts.with_phase(Phase::Transport);
    let family = tree
        .post_processing_dir()
        .join(RegionName::interior_air().as_str())
        .join("wallHeatFlux");
    let mut patches: BTreeMap<String, Vec<HeatFluxRow>> = BTreeMap::new();
    if !family.is_dir() {
        return Ok(patches);
    }
    let times = phase_times(tree, &opts)?;
    let latest = times.last().map_or(0.0, |t| t.time_s);
    for restart in restart_dirs(&family)? {
        let r = restart.time_s;
        let known = opts.pruned || times.iter().any(|t| time_key(t.time_s) == time_key(r));
        if !opts.restart_in_phase(r) || time_key(r) >= time_key(latest) || !known {
            continue;
        }
        let path = family.join(&restart.name).join("wallHeatFlux.dat");
        if !path.is_file() {
            return Err(ResultsError::MissingOutput { path });
        }
        for (line, cols) in read_table(&path)? {
            let time_s = parse_number(&path, line, cols.first())?;
            if time_key(time_s) <= 0 || time_key(time_s) > time_key(opts.duration_s) {
                continue;
            }
            let patch = cols.get(1).cloned().ok_or_else(|| ResultsError::Parse {
                path: path.clone(),
                line,
                what: "missing patch column".to_string(),
            })?;
            let sign = if patch == CARRIER_PATCH { 1.0 } else { -1.0 };
            patches.entry(patch).or_default().push(HeatFluxRow {
                time_s,
                min_w_per_m2: sign * parse_number(&path, line, cols.get(2))?,
                max_w_per_m2: sign * parse_number(&path, line, cols.get(3))?,
                integral_w: sign * parse_number(&path, line, cols.get(4))?,
            });
        }
    }
    for rows in patches.values_mut() {
        rows.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
        let mut deduped: Vec<HeatFluxRow> = Vec::with_capacity(rows.len());
        for row in rows.drain(..) {
            match deduped.last_mut() {
                Some(last) if time_key(last.time_s) == time_key(row.time_s) => *last = row,
                _ => deduped.push(row),
            }
        }
        *rows = deduped;
    }
    Ok(patches)
}

/// Aggregated output of one phase.
#[derive(Debug, Clone)]
pub struct PostprocessSummary {
    pub regions: Vec<RegionTimeSeries>,
    pub cargo: Option<RegionTimeSeries>,
    pub wall_heat_flux_patches: Vec<String>,
}

/// Aggregate every region of a phase and write `<series_dir>/<region>.csv`
/// plus `cargo.csv`; during transport also `<heat_flux_dir>/<patch>.csv`.
pub fn postprocess(
    tree: &SolverTree,
    regions: &[RegionName],
    opts: &AggregateOptions,
    series_dir: &Path,
    heat_flux_dir: Option<&Path>,
) -> ResultsResult<PostprocessSummary> {
    let regions: Vec<&RegionName> = regions
        .iter()
        .filter(|r| opts.phase == Phase::Transport || r.is_cargo())
        .collect();

    let mut series = Vec::with_capacity(regions.len());
    for region in regions {
        let table = aggregate_region(tree, region, opts)?;
        table.write_csv(&series_dir.join(format!("{region}.csv")))?;
        debug!(region = %region, rows = table.rows.len(), "region series written");
        series.push(table);
    }

    let cargo = cargo_series(&series);
    if let Some(cargo) = &cargo {
        cargo.write_csv(&series_dir.join(format!("{CARGO_SERIES}.csv")))?;
    }

    let mut patches = Vec::new();
    if let (Phase::Transport, Some(dir)) = (opts.phase, heat_flux_dir) {
        for (patch, rows) in wall_heat_flux(tree, opts)? {
            write_heat_flux_csv(&dir.join(format!("{patch}.csv")), &rows)?;
            patches.push(patch);
        }
    }

    info!(
        phase = ?opts.phase,
        regions = series.len(),
        patches = patches.len(),
        "postprocessing finished"
    );
    Ok(PostprocessSummary {
        regions: series,
        cargo,
        wall_heat_flux_patches: patches,
    })
}
