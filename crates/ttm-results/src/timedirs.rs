//! Solver time directories.
//!
//! The solver writes one directory per output time, named by the simulated
//! time in seconds, either directly in the case directory or, when the case
//! is decomposed, inside every `processor<N>` directory. A time directory is
//! complete when it holds one sub-directory per expected region.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use ttm_core::RegionName;

use crate::ResultsResult;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeDir {
    pub time_s: f64,
    pub name: String,
}

impl TimeDir {
    pub fn is_initial(&self) -> bool {
        self.time_s == 0.0
    }
}

fn parse_time(name: &str) -> Option<f64> {
    let t: f64 = name.parse().ok()?;
    (t.is_finite() && t >= 0.0).then_some(t)
}

/// Numerically named sub-directories of `dir`, sorted.
pub(crate) fn list_times(dir: &Path) -> ResultsResult<Vec<TimeDir>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut times = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(time_s) = parse_time(&name) {
            times.push(TimeDir { time_s, name });
        }
    }
    times.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
    Ok(times)
}

#[derive(Debug, Clone)]
pub struct SolverTree {
    case_dir: PathBuf,
}

impl SolverTree {
    pub fn new(case_dir: impl Into<PathBuf>) -> Self {
        Self {
            case_dir: case_dir.into(),
        }
    }

    pub fn case_dir(&self) -> &Path {
        &self.case_dir
    }

    pub fn post_processing_dir(&self) -> PathBuf {
        self.case_dir.join("postProcessing")
    }

    /// `processor<N>` directories, ordered by N.
    pub fn processor_dirs(&self) -> ResultsResult<Vec<PathBuf>> {
        if !self.case_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.case_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(index) = name.strip_prefix("processor").and_then(|n| n.parse::<usize>().ok()) {
                if entry.file_type()?.is_dir() {
                    dirs.push((index, entry.path()));
                }
            }
        }
        dirs.sort_by_key(|(i, _)| *i);
        Ok(dirs.into_iter().map(|(_, p)| p).collect())
    }

    pub fn is_decomposed(&self) -> bool {
        self.case_dir.join("processor0").is_dir()
    }

    fn time_root(&self) -> PathBuf {
        if self.is_decomposed() {
            self.case_dir.join("processor0")
        } else {
            self.case_dir.clone()
        }
    }

    /// Authoritative time list, numerically sorted.
    pub fn times(&self) -> ResultsResult<Vec<TimeDir>> {
        list_times(&self.time_root())
    }

    /// Times present in the case directory itself.
    pub fn reconstructed_times(&self) -> ResultsResult<Vec<TimeDir>> {
        list_times(&self.case_dir)
    }

    pub fn latest(&self) -> ResultsResult<Option<TimeDir>> {
        Ok(self.times()?.pop())
    }

    /// Latest simulated time, 0 when nothing has been written.
    pub fn latest_time_s(&self) -> ResultsResult<f64> {
        Ok(self.latest()?.map_or(0.0, |t| t.time_s))
    }

    /// Region sub-directories present in a time directory.
    pub fn regions_at(&self, time: &TimeDir) -> ResultsResult<BTreeSet<String>> {
        let dir = self.time_root().join(&time.name);
        let mut regions = BTreeSet::new();
        if !dir.is_dir() {
            return Ok(regions);
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() && name != "uniform" {
                regions.insert(name);
            }
        }
        Ok(regions)
    }

    /// Time 0 always counts as complete.
    pub fn is_complete(&self, time: &TimeDir, expected: &[RegionName]) -> ResultsResult<bool> {
        if time.is_initial() {
            return Ok(true);
        }
        let present = self.regions_at(time)?;
        Ok(expected.iter().all(|r| present.contains(r.as_str())))
    }

    /// Delete a time directory from every processor directory and from the
    /// reconstructed case.
    pub fn remove_time(&self, time: &TimeDir) -> ResultsResult<()> {
        let mut roots = self.processor_dirs()?;
        roots.push(self.case_dir.clone());
        for root in roots {
            let dir = root.join(&time.name);
            if dir.is_dir() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// Delete incomplete trailing time directories and return the resume point.
    pub fn discard_incomplete(&self, expected: &[RegionName]) -> ResultsResult<f64> {
        while let Some(latest) = self.latest()? {
            if self.is_complete(&latest, expected)? {
                return Ok(latest.time_s);
            }
            warn!(time = %latest.name, "deleting incomplete time directory");
            self.remove_time(&latest)?;
        }
        Ok(0.0)
    }

    /// Keep the `keep` most recent time directories (and time 0); returns the removed times.
    pub fn purge(&self, keep: usize) -> ResultsResult<Vec<f64>> {
        let times = self.times()?;
        let cutoff = times.len().saturating_sub(keep);
        let mut removed = Vec::new();
        for time in &times[..cutoff] {
            if time.is_initial() {
                continue;
            }
            self.remove_time(time)?;
            removed.push(time.time_s);
        }
        if !removed.is_empty() {
            debug!(count = removed.len(), "purged time directories");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mkdirs(root: &Path, time: &str, regions: &[&str]) {
        for region in regions {
            fs::create_dir_all(root.join(time).join(region)).unwrap();
        }
    }

    #[test]
    fn times_are_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for t in ["0", "36000", "3600", "7200.5", "constant", "0.org"] {
            fs::create_dir_all(dir.path().join(t)).unwrap();
        }
        let tree = SolverTree::new(dir.path());
        let names: Vec<String> = tree.times().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["0", "3600", "7200.5", "36000"]);
    }

    #[test]
    fn decomposed_tree_reads_processor0() {
        let dir = tempfile::tempdir().unwrap();
        let case = dir.path();
        mkdirs(&case.join("processor0"), "3600", &["airInside"]);
        mkdirs(&case.join("processor1"), "3600", &["airInside"]);
        fs::create_dir_all(case.join("0")).unwrap();
        let tree = SolverTree::new(case);
        assert!(tree.is_decomposed());
        assert_eq!(tree.latest_time_s().unwrap(), 3600.0);
        assert_eq!(tree.processor_dirs().unwrap().len(), 2);
    }

    #[test]
    fn discard_incomplete_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let case = dir.path();
        let expected = [RegionName::interior_air(), RegionName::battery(0, 0)];
        for p in ["processor0", "processor1"] {
            mkdirs(&case.join(p), "0", &["airInside", "battery0_0"]);
            mkdirs(&case.join(p), "3600", &["airInside", "battery0_0", "uniform"]);
            mkdirs(&case.join(p), "7200", &["airInside"]);
        }
        let tree = SolverTree::new(case);
        assert_eq!(tree.discard_incomplete(&expected).unwrap(), 3600.0);
        assert!(!case.join("processor1/7200").exists());
        assert!(case.join("processor1/3600").exists());
    }

    #[test]
    fn initial_time_is_never_incomplete_or_purged() {
        let dir = tempfile::tempdir().unwrap();
        let case = dir.path();
        fs::create_dir_all(case.join("0")).unwrap();
        for t in ["3600", "7200", "10800"] {
            mkdirs(case, t, &["airInside"]);
        }
        let tree = SolverTree::new(case);
        assert_eq!(
            tree.discard_incomplete(&[RegionName::battery(0, 0)]).unwrap(),
            0.0
        );

        for t in ["3600", "7200", "10800"] {
            mkdirs(case, t, &["airInside"]);
        }
        assert_eq!(tree.purge(2).unwrap(), vec![3600.0]);
        let names: Vec<String> = tree.times().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["0", "7200", "10800"]);
    }
}
