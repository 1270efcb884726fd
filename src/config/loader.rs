// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{DriverConfig, RawDriverConfig};
use crate::errors::Result;

/// Environment variable that overrides the default settings path.
pub const CONFIG_ENV_VAR: &str = "BUCK_RPC_CONFIG";

/// Load driver settings from a given path and return the raw `RawDriverConfig`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for the
/// checked form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawDriverConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawDriverConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load driver settings from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<DriverConfig> {
    let raw_config = load_from_path(&path)?;
    let config = DriverConfig::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<DriverConfig> {
    let path = path.as_ref();
    if !path.is_file() {
        debug!(path = %path.display(), "no driver settings file; using defaults");
        return Ok(DriverConfig::default());
    }
    load_and_validate(path)
}

/// Settings path: `BUCK_RPC_CONFIG` if set, otherwise `buck-rpc.toml` in the
/// current working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("buck-rpc.toml"))
}
