//! Prior wall temperature of a region.

use tracing::debug;
use ttm_core::RegionName;
use ttm_results::{Metric, SolverTree, value_at};

use crate::BoundaryResult;

/// Surface-averaged wall temperature at the latest complete time, or the
/// initial temperature when no segment has produced output yet.
pub fn prior_wall_temperature(
    tree: &SolverTree,
    region: &RegionName,
    initial_temperature_k: f64,
) -> BoundaryResult<f64> {
    let latest_s = tree.latest_time_s()?;
    if latest_s == 0.0 {
        return Ok(initial_temperature_k);
    }
    match value_at(&tree.post_processing_dir(), region, Metric::WallTemperature, latest_s)? {
        Some(t) => Ok(t),
        None => {
            debug!(region = %region, "no wall temperature output yet, using initial temperature");
            Ok(initial_temperature_k)
        }
    }
}
