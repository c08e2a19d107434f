//! Append-only `(segment start, value)` logs.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::BoundaryResult;

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All rows, empty when the log does not exist yet.
    pub fn rows(&self) -> BoundaryResult<Vec<(f64, f64)>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            rows.push(record?);
        }
        Ok(rows)
    }

    pub fn last_value(&self) -> BoundaryResult<Option<f64>> {
        Ok(self.rows()?.last().map(|(_, v)| *v))
    }

    pub fn append(&self, time_s: f64, value: f64) -> BoundaryResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize((time_s, value))?;
        writer.flush()?;
        Ok(())
    }

    /// Drop rows at or after `from_s`; returns how many were dropped.
    pub fn rewind(&self, from_s: f64) -> BoundaryResult<usize> {
        let rows = self.rows()?;
        let keep: Vec<(f64, f64)> = rows.iter().copied().filter(|(t, _)| *t < from_s).collect();
        let dropped = rows.len() - keep.len();
        if dropped == 0 {
            return Ok(0);
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;
        for row in &keep {
            writer.serialize(row)?;
        }
        writer.flush()?;
        debug!(path = %self.path.display(), dropped, "audit log rewound");
        Ok(dropped)
    }
}
