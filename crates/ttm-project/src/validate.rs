//! Campaign validation logic.

use ttm_core::CELSIUS_OFFSET_K;

use crate::schema::{CAMPAIGN_VERSION, CampaignDef, CargoDef, FreightDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

fn temperature(field: &str, value_c: f64) -> Result<(), ValidationError> {
    if value_c.is_finite() && value_c > -CELSIUS_OFFSET_K {
        Ok(())
    } else {
        Err(invalid(field, value_c, "must be above absolute zero"))
    }
}

pub fn validate_campaign(campaign: &CampaignDef) -> Result<(), ValidationError> {
    if campaign.version != CAMPAIGN_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: campaign.version,
        });
    }
    if campaign.name.trim().is_empty() {
        return Err(invalid("name", "", "must not be empty"));
    }

    temperature("initial_temperature_c", campaign.initial_temperature_c)?;
    if let Some(t) = campaign.arrival_temperature_c {
        temperature("arrival_temperature_c", t)?;
    }

    if campaign.cargo.is_empty() {
        return Err(invalid("cargo", "[]", "at least one cargo item is required"));
    }
    if campaign.carrier.is_car() {
        if campaign.cargo.len() != 1 {
            return Err(ValidationError::Unsupported {
                feature: "car transport".to_string(),
                reason: "only one cargo item is supported".to_string(),
            });
        }
        if !matches!(campaign.cargo[0], CargoDef::Car { .. }) {
            return Err(ValidationError::Unsupported {
                feature: "car transport".to_string(),
                reason: "cargo must be of type car".to_string(),
            });
        }
    } else if campaign.cargo.iter().any(|c| matches!(c, CargoDef::Car { .. })) {
        return Err(ValidationError::Unsupported {
            feature: "car cargo".to_string(),
            reason: "requires carrier kind car".to_string(),
        });
    }

    for (i, cargo) in campaign.cargo.iter().enumerate() {
        validate_freight(&format!("cargo[{i}].freight"), cargo.freight())?;
        if let CargoDef::Pallet {
            position_m,
            orientation_deg,
            ..
        } = cargo
        {
            if position_m.iter().chain(orientation_deg).any(|v| !v.is_finite()) {
                return Err(invalid(
                    format!("cargo[{i}]"),
                    format!("{position_m:?} {orientation_deg:?}"),
                    "position and orientation must be finite",
                ));
            }
        }
    }

    if campaign.solver.cpu_cores == Some(0) {
        return Err(invalid("solver.cpu_cores", 0, "must be at least 1"));
    }
    if campaign.solver.solver_log.trim().is_empty() {
        return Err(invalid("solver.solver_log", "", "must not be empty"));
    }

    let tuning = &campaign.tuning;
    positive("tuning.speed_threshold_mps", tuning.speed_threshold_mps)?;
    positive(
        "tuning.coefficient_floor_w_per_m2k",
        tuning.coefficient_floor_w_per_m2k,
    )?;
    positive("tuning.arrival_threshold_k", tuning.arrival_threshold_k)?;
    positive("tuning.arrival_chunk_s", tuning.arrival_chunk_s)?;
    if tuning.max_arrival_chunks == 0 {
        return Err(invalid("tuning.max_arrival_chunks", 0, "must be at least 1"));
    }

    if let Some(offset) = campaign.utc_offset_hours {
        if !offset.is_finite() || offset.abs() > 14.0 {
            return Err(invalid("utc_offset_hours", offset, "must lie within ±14 h"));
        }
    }

    Ok(())
}

fn validate_freight(field: &str, freight: &FreightDef) -> Result<(), ValidationError> {
    if !matches!(freight.freight_type.as_str(), "cells" | "modules" | "pack") {
        return Err(ValidationError::Unsupported {
            feature: format!("{field}.type = {}", freight.freight_type),
            reason: "expected cells, modules or pack".to_string(),
        });
    }
    for (axis, d) in freight.dimensions_m.iter().enumerate() {
        positive(&format!("{field}.dimensions_m[{axis}]"), *d)?;
    }
    positive(&format!("{field}.weight_kg"), freight.weight_kg)?;
    positive(
        &format!("{field}.heat_capacity_j_per_kgk"),
        freight.heat_capacity_j_per_kgk,
    )?;
    for (axis, k) in freight.conductivity_w_per_mk.iter().enumerate() {
        positive(&format!("{field}.conductivity_w_per_mk[{axis}]"), *k)?;
    }
    if let Some(counts) = freight.elements_in_package {
        if counts.contains(&0) {
            return Err(invalid(
                format!("{field}.elements_in_package"),
                format!("{counts:?}"),
                "every axis needs at least one element",
            ));
        }
    }
    Ok(())
}
