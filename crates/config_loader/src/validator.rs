//! Configuration validation
//!
//! Rules:
//! - at least one destination
//! - destination name unique and non-empty
//! - at least one server per destination
//! - maximum_batch_size > 0 (outlet-wide and per-destination overrides)
//! - maximum_wait_time_ms > 0
//! - minimum_batch_size_divider > 0

use std::collections::HashSet;

use contracts::{BatchTuning, OutletConfig, OutletError};

/// Validate an outlet configuration
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &OutletConfig) -> Result<(), OutletError> {
    validate_divider(config)?;
    validate_tuning("batch", &config.batch)?;
    validate_destinations(config)?;
    Ok(())
}

fn validate_divider(config: &OutletConfig) -> Result<(), OutletError> {
    if config.minimum_batch_size_divider == 0 {
        return Err(OutletError::config_validation(
            "minimum_batch_size_divider",
            "minimum_batch_size_divider must be > 0",
        ));
    }
    Ok(())
}

fn validate_tuning(field: &str, tuning: &BatchTuning) -> Result<(), OutletError> {
    if tuning.maximum_batch_size == 0 {
        return Err(OutletError::config_validation(
            format!("{field}.maximum_batch_size"),
            "maximum_batch_size must be > 0",
        ));
    }
    if tuning.maximum_wait_time_ms == 0 {
        return Err(OutletError::config_validation(
            format!("{field}.maximum_wait_time_ms"),
            "maximum_wait_time_ms must be > 0",
        ));
    }
    Ok(())
}

fn validate_destinations(config: &OutletConfig) -> Result<(), OutletError> {
    if config.destinations.is_empty() {
        return Err(OutletError::config_validation(
            "destinations",
            "at least one destination is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, dest) in config.destinations.iter().enumerate() {
        if dest.name.is_empty() {
            return Err(OutletError::config_validation(
                format!("destinations[{idx}].name"),
                "destination name cannot be empty",
            ));
        }
        if !seen.insert(&dest.name) {
            return Err(OutletError::config_validation(
                format!("destinations[name={}]", dest.name),
                "duplicate destination name",
            ));
        }
        if dest.servers.is_empty() {
            return Err(OutletError::config_validation(
                format!("destinations[{}].servers", dest.name),
                "at least one server is required",
            ));
        }
        if let Some(tuning) = &dest.batch {
            validate_tuning(&format!("destinations[{}].batch", dest.name), tuning)?;
        }
    }
    Ok(())
}
