//! On-disk campaign layout.
//!
//! ```text
//! <campaign>/campaign.yaml
//! <campaign>/weatherdata.csv
//! <campaign>/case/                       solver working tree
//! <campaign>/logs/                       archived solver logs
//! <campaign>/postProcessing/speed.csv
//! <campaign>/postProcessing/heattransfercoefficient.csv
//! <campaign>/postProcessing/{temperature,wallHeatFlux,probes,arrival}/<region>.csv
//! ```

use std::path::{Path, PathBuf};

use ttm_core::RegionName;

pub const CAMPAIGN_FILE: &str = "campaign.yaml";
pub const WEATHER_FILE: &str = "weatherdata.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignLayout {
    root: PathBuf,
}

impl CampaignLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn campaign_file(&self) -> PathBuf {
        self.root.join(CAMPAIGN_FILE)
    }

    pub fn weather_file(&self) -> PathBuf {
        self.root.join(WEATHER_FILE)
    }

    pub fn case_dir(&self) -> PathBuf {
        self.root.join("case")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn post_processing_dir(&self) -> PathBuf {
        self.root.join("postProcessing")
    }

    pub fn speed_log(&self) -> PathBuf {
        self.post_processing_dir().join("speed.csv")
    }

    pub fn coefficient_log(&self) -> PathBuf {
        self.post_processing_dir().join("heattransfercoefficient.csv")
    }

    pub fn temperature_dir(&self) -> PathBuf {
        self.post_processing_dir().join("temperature")
    }

    pub fn wall_heat_flux_dir(&self) -> PathBuf {
        self.post_processing_dir().join("wallHeatFlux")
    }

    pub fn probes_dir(&self) -> PathBuf {
        self.post_processing_dir().join("probes")
    }

    pub fn arrival_dir(&self) -> PathBuf {
        self.post_processing_dir().join("arrival")
    }

    pub fn arrival_record(&self) -> PathBuf {
        self.arrival_dir().join("arrival.csv")
    }

    pub fn temperature_csv(&self, region: &RegionName) -> PathBuf {
        self.temperature_dir().join(format!("{region}.csv"))
    }

    pub fn arrival_csv(&self, region: &RegionName) -> PathBuf {
        self.arrival_dir().join(format!("{region}.csv"))
    }

    pub fn probe_csv(&self, region: &RegionName) -> PathBuf {
        self.probes_dir().join(format!("{region}.csv"))
    }

    /// Create every output directory.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.case_dir(),
            self.logs_dir(),
            self.temperature_dir(),
            self.wall_heat_flux_dir(),
            self.probes_dir(),
            self.arrival_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_convention() {
        let layout = CampaignLayout::new("/tmp/run1");
        assert_eq!(layout.case_dir(), PathBuf::from("/tmp/run1/case"));
        assert_eq!(
            layout.temperature_csv(&RegionName::battery(0, 2)),
            PathBuf::from("/tmp/run1/postProcessing/temperature/battery0_2.csv")
        );
        assert_eq!(
            layout.arrival_record(),
            PathBuf::from("/tmp/run1/postProcessing/arrival/arrival.csv")
        );
    }
}
