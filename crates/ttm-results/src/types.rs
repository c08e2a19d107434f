//! Aggregated result tables.

use std::path::Path;

use ttm_core::time_name;

use crate::ResultsResult;
use crate::fragments::Metric;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRow {
    pub time_s: f64,
    /// One value per column of the owning series, in °C.
    pub values: Vec<Option<f64>>,
}

/// Continuous, row-aligned table for one region (or the cargo average).
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTimeSeries {
    pub name: String,
    pub columns: Vec<Metric>,
    pub rows: Vec<SeriesRow>,
}

impl RegionTimeSeries {
    pub fn column_index(&self, metric: Metric) -> Option<usize> {
        self.columns.iter().position(|m| *m == metric)
    }

    /// Present (time, value) pairs of one column.
    pub fn values(&self, metric: Metric) -> Vec<(f64, f64)> {
        let Some(index) = self.column_index(metric) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.values[index].map(|v| (row.time_s, v)))
            .collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.time_s).collect()
    }

    pub fn write_csv(&self, path: &Path) -> ResultsResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec!["time".to_string()];
        header.extend(self.columns.iter().map(|m| m.column()));
        writer.write_record(&header)?;
        for row in &self.rows {
            let mut record = vec![time_name(row.time_s)];
            record.extend(row.values.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Wall heat flux of one patch at one time, positive into the domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatFluxRow {
    pub time_s: f64,
    pub min_w_per_m2: f64,
    pub max_w_per_m2: f64,
    pub integral_w: f64,
}

pub fn write_heat_flux_csv(path: &Path, rows: &[HeatFluxRow]) -> ResultsResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["time", "min", "max", "integral"])?;
    for row in rows {
        writer.write_record([
            time_name(row.time_s),
            row.min_w_per_m2.to_string(),
            row.max_w_per_m2.to_string(),
            row.integral_w.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
