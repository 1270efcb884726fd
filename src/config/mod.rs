// src/config/mod.rs

//! Configuration for the driver.
//!
//! Two unrelated files are read here:
//! - `.buckconfig`, the project's own engine config (`buckconfig.rs`).
//! - `buck-rpc.toml`, the driver's settings (`model.rs`, `loader.rs`,
//!   `validate.rs`): which executable to run and how wide the pools are.

pub mod buckconfig;
pub mod loader;
pub mod model;
pub mod validate;

pub use buckconfig::{BuckConfig, ConfigReader, BUCKCONFIG_FILE, GLOBAL_SECTION};
pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{DriverConfig, EngineSection, PoolSection, RawDriverConfig};
