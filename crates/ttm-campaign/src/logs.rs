//! Archiving solver logs without overwriting.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::CampaignResult;

pub const ARCHIVE_STAMP: &str = "%Y-%m-%d_%H-%M-%S";

/// `dir/name`, or `dir/name_<n>` with the first free `n`.
pub fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let first = dir.join(name);
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{name}_{n}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

fn move_file(from: &Path, to: &Path) -> CampaignResult<()> {
    if fs::rename(from, to).is_err() {
        // Crossing file systems.
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

/// Move the solver log of one segment into `logs_dir`, named after the
/// segment's UTC start.
pub fn archive_solver_log(
    case_dir: &Path,
    logs_dir: &Path,
    log_name: &str,
    stamp: DateTime<Utc>,
) -> CampaignResult<Option<PathBuf>> {
    let log = case_dir.join(log_name);
    if !log.is_file() {
        return Ok(None);
    }
    fs::create_dir_all(logs_dir)?;
    let target = unique_destination(logs_dir, &format!("{log_name}_{}", stamp.format(ARCHIVE_STAMP)));
    move_file(&log, &target)?;
    info!(log = %target.display(), "solver log archived");
    Ok(Some(target))
}

/// Move every `log.*` file left in the case directory into `logs_dir`.
pub fn collect_logs(case_dir: &Path, logs_dir: &Path) -> CampaignResult<Vec<PathBuf>> {
    let mut moved = Vec::new();
    if !case_dir.is_dir() {
        return Ok(moved);
    }
    let mut names: Vec<String> = fs::read_dir(case_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("log."))
        .collect();
    names.sort();
    if names.is_empty() {
        return Ok(moved);
    }
    fs::create_dir_all(logs_dir)?;
    for name in names {
        let target = unique_destination(logs_dir, &name);
        move_file(&case_dir.join(&name), &target)?;
        moved.push(target);
    }
    debug!(count = moved.len(), "case logs collected");
    Ok(moved)
}
