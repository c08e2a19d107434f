//! ttm-project: campaign file format, directory layout, weather input and
//! the solver configuration store.

pub mod carrier;
pub mod layout;
pub mod schema;
pub mod slots;
pub mod store;
pub mod validate;
pub mod weather;

pub use carrier::{CELL_SIZE_M, CarrierKind, CarrierSpec};
pub use layout::CampaignLayout;
pub use schema::*;
pub use slots::{BoundarySlots, ConvectiveBoundary, RunControl, SolarLoad, WallLayer};
pub use store::{ConfigStore, FileConfigStore, KeyPath};
pub use validate::{ValidationError, validate_campaign};
pub use weather::{CsvWeatherSource, WeatherSample, WeatherSource, with_retry};

use ttm_cargo::CargoError;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cargo error: {0}")]
    Cargo(#[from] CargoError),

    #[error("Weather data error: {what}")]
    Weather { what: String },

    #[error("Config store error in {document}: {what}")]
    Store { document: String, what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<CampaignDef> {
    let content = std::fs::read_to_string(path)?;
    let campaign: CampaignDef = serde_yaml::from_str(&content)?;
    validate_campaign(&campaign)?;
    Ok(campaign)
}

pub fn save_yaml(path: &std::path::Path, campaign: &CampaignDef) -> ProjectResult<()> {
    validate_campaign(campaign)?;
    let content = serde_yaml::to_string(campaign)?;
    std::fs::write(path, content)?;
    Ok(())
}
