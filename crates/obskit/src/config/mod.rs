//! Combined config loader (strict parsing).

pub mod schema;

use std::fs;

use obskit_core::error::{ObsError, Result};

pub use schema::ObskitConfig;

pub fn load_from_file(path: &str) -> Result<ObskitConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ObsError::Validation(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ObskitConfig> {
    let cfg: ObskitConfig = serde_yaml::from_str(s)
        .map_err(|e| ObsError::Validation(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_json_str(s: &str) -> Result<ObskitConfig> {
    let cfg: ObskitConfig = serde_json::from_str(s)
        .map_err(|e| ObsError::Validation(format!("invalid json: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
