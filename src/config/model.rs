// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Driver settings as read from `buck-rpc.toml`.
///
/// ```toml
/// [engine]
/// path = "/opt/buck/bin/buck"
/// no_daemon = false
///
/// [pool]
/// read_only_capacity = 4
///
/// [env]
/// BUCK_EXTRA_JAVA_ARGS = "-Xmx4g"
/// ```
///
/// Every section is optional. Use [`DriverConfig`] (obtained through
/// `TryFrom`) everywhere outside the loader; it has passed validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDriverConfig {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub pool: PoolSection,

    /// Extra variables merged over the original environment of every
    /// invocation.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Executable to run. A bare name is resolved through `PATH`.
    #[serde(default = "default_engine_path")]
    pub path: PathBuf,

    /// Treat the buck daemon as disabled even if `NO_BUCKD` is unset.
    #[serde(default)]
    pub no_daemon: bool,
}

fn default_engine_path() -> PathBuf {
    PathBuf::from("buck")
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            path: default_engine_path(),
            no_daemon: false,
        }
    }
}

/// `[pool]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolSection {
    /// Override for the read-only pool capacity. `None` means
    /// `max(1, available_parallelism - 1)`.
    #[serde(default)]
    pub read_only_capacity: Option<usize>,
}

/// Validated driver settings.
#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    pub engine: EngineSection,
    pub pool: PoolSection,
    pub env: BTreeMap<String, String>,
}

impl DriverConfig {
    pub(crate) fn new_unchecked(
        engine: EngineSection,
        pool: PoolSection,
        env: BTreeMap<String, String>,
    ) -> Self {
        Self { engine, pool, env }
    }
}
