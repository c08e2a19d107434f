//! Function-object output fragments.
//!
//! Each solver invocation writes its sampled values into a fresh
//! sub-directory named after the time it restarted from:
//!
//! ```text
//! postProcessing/<region>/<function>_<region>/<restart>/<file>.dat
//! postProcessing/airInside/wallHeatFlux/<restart>/wallHeatFlux.dat
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use ttm_core::RegionName;

use crate::timedirs::{TimeDir, list_times};
use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Average,
    Min,
    Max,
    WallTemperature,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Average,
        Metric::Min,
        Metric::Max,
        Metric::WallTemperature,
    ];

    pub fn function(self) -> &'static str {
        match self {
            Metric::Average => "average",
            Metric::Min => "min",
            Metric::Max => "max",
            Metric::WallTemperature => "wallTemperature",
        }
    }

    /// Column header in aggregated tables, e.g. `average(T)`.
    pub fn column(self) -> String {
        format!("{}(T)", self.function())
    }

    pub fn family_dir(self, post_processing: &Path, region: &RegionName) -> PathBuf {
        post_processing
            .join(region.as_str())
            .join(format!("{}_{region}", self.function()))
    }

    /// File names to try inside a restart directory, preferred first.
    fn file_candidates(self, restart: &TimeDir) -> Vec<String> {
        match self {
            Metric::Average | Metric::Min | Metric::Max => vec!["volFieldValue.dat".to_string()],
            Metric::WallTemperature => vec![
                "surfaceFieldValue.dat".to_string(),
                format!("surfaceFieldValue_{}.dat", restart.name),
            ],
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function())
    }
}

/// One restart-bounded slice of output for one metric/region.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub restart: TimeDir,
    pub path: PathBuf,
    /// (time, value) rows in file order.
    pub rows: Vec<(f64, f64)>,
}

/// Whitespace separated data rows of a `.dat` file, comments and blanks skipped.
pub fn read_table(path: &Path) -> ResultsResult<Vec<(usize, Vec<String>)>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| (i + 1, line.split_whitespace().map(str::to_string).collect()))
        .collect())
}

pub(crate) fn parse_number(path: &Path, line: usize, field: Option<&String>) -> ResultsResult<f64> {
    let field = field.ok_or_else(|| ResultsError::Parse {
        path: path.to_path_buf(),
        line,
        what: "missing column".to_string(),
    })?;
    field.parse().map_err(|_| ResultsError::Parse {
        path: path.to_path_buf(),
        line,
        what: format!("'{field}' is not a number"),
    })
}

/// (time, value) rows from the first two columns.
pub fn read_fragment(path: &Path) -> ResultsResult<Vec<(f64, f64)>> {
    read_table(path)?
        .into_iter()
        .map(|(line, cols)| {
            Ok((
                parse_number(path, line, cols.first())?,
                parse_number(path, line, cols.get(1))?,
            ))
        })
        .collect()
}

/// Restart directories of a fragment family, numerically sorted.
pub fn restart_dirs(family: &Path) -> ResultsResult<Vec<TimeDir>> {
    list_times(family)
}

fn resolve_file(family: &Path, restart: &TimeDir, metric: Metric) -> ResultsResult<PathBuf> {
    let dir = family.join(&restart.name);
    let candidates = metric.file_candidates(restart);
    for (i, name) in candidates.iter().enumerate() {
        let path = dir.join(name);
        if path.is_file() {
            if i > 0 {
                debug!(path = %path.display(), "using alternate output file name");
            }
            return Ok(path);
        }
    }
    Err(ResultsError::MissingOutput {
        path: dir.join(&candidates[0]),
    })
}

/// Every fragment of one metric/region, in restart order.
pub fn list_fragments(
    post_processing: &Path,
    region: &RegionName,
    metric: Metric,
) -> ResultsResult<Vec<Fragment>> {
    let family = metric.family_dir(post_processing, region);
    restart_dirs(&family)?
        .into_iter()
        .map(|restart| {
            let path = resolve_file(&family, &restart, metric)?;
            let rows = read_fragment(&path)?;
            Ok(Fragment {
                restart,
                path,
                rows,
            })
        })
        .collect()
}

/// Microsecond key so timestamps compare exactly after float noise.
pub(crate) fn time_key(t: f64) -> i64 {
    (t * 1e6).round() as i64
}

/// Value at `at_s` as written by the newest restart before it, `None` when
/// nothing has been written yet.
pub fn value_at(
    post_processing: &Path,
    region: &RegionName,
    metric: Metric,
    at_s: f64,
) -> ResultsResult<Option<f64>> {
    let family = metric.family_dir(post_processing, region);
    let Some(restart) = restart_dirs(&family)?
        .into_iter()
        .rev()
        .find(|r| time_key(r.time_s) < time_key(at_s))
    else {
        return Ok(None);
    };
    let path = resolve_file(&family, &restart, metric)?;
    Ok(read_fragment(&path)?
        .into_iter()
        .rev()
        .find(|(t, _)| time_key(*t) <= time_key(at_s))
        .map(|(_, v)| v))
}

/// Delete every restart directory at or after `from_s`, for every region
/// and function object. Returns how many were removed.
pub fn discard_fragments_from(post_processing: &Path, from_s: f64) -> ResultsResult<usize> {
    if !post_processing.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for region in fs::read_dir(post_processing)? {
        let region = region?;
        if !region.file_type()?.is_dir() {
            continue;
        }
        for family in fs::read_dir(region.path())? {
            let family = family?;
            if !family.file_type()?.is_dir() {
                continue;
            }
            for restart in restart_dirs(&family.path())? {
                if time_key(restart.time_s) >= time_key(from_s) {
                    fs::remove_dir_all(family.path().join(&restart.name))?;
                    removed += 1;
                }
            }
        }
    }
    if removed > 0 {
        debug!(removed, from_s, "discarded stale output fragments");
    }
    Ok(removed)
}
