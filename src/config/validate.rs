// src/config/validate.rs

use crate::config::model::{DriverConfig, RawDriverConfig};
use crate::errors::{BuckError, Result};

impl TryFrom<RawDriverConfig> for DriverConfig {
    type Error = BuckError;

    fn try_from(raw: RawDriverConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(DriverConfig::new_unchecked(raw.engine, raw.pool, raw.env))
    }
}

fn validate_raw_config(cfg: &RawDriverConfig) -> Result<()> {
    validate_engine(cfg)?;
    validate_pool(cfg)?;
    validate_env(cfg)?;
    Ok(())
}

fn validate_engine(cfg: &RawDriverConfig) -> Result<()> {
    if cfg.engine.path.as_os_str().is_empty() {
        return Err(BuckError::Config(
            "[engine].path must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_pool(cfg: &RawDriverConfig) -> Result<()> {
    if cfg.pool.read_only_capacity == Some(0) {
        return Err(BuckError::Config(
            "[pool].read_only_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_env(cfg: &RawDriverConfig) -> Result<()> {
    for key in cfg.env.keys() {
        if key.is_empty() || key.contains('=') {
            return Err(BuckError::Config(format!(
                "[env] has invalid variable name '{}'",
                key
            )));
        }
    }
    Ok(())
}
