// src/exec/env.rs

//! The environment handed to buck.
//!
//! buckd restarts whenever the environment of an incoming command differs
//! from the one it was started with. Children therefore get the environment
//! the host process was *launched* with, not whatever it has mutated since,
//! plus explicit overrides.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tracing::debug;

/// Variable that disables the buck daemon when set to `1`.
pub const NO_DAEMON_ENV_VAR: &str = "NO_BUCKD";

static ORIGINAL_ENV: OnceLock<BTreeMap<String, String>> = OnceLock::new();

/// Snapshot the process environment. Call this first thing in `main`; later
/// calls return the first snapshot. Non-UTF-8 variables are skipped.
pub fn capture_original_env() -> &'static BTreeMap<String, String> {
    ORIGINAL_ENV.get_or_init(|| {
        let env: BTreeMap<String, String> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        debug!(vars = env.len(), "captured original environment");
        env
    })
}

pub fn original_env() -> &'static BTreeMap<String, String> {
    capture_original_env()
}

/// `base` with `overrides` applied on top.
pub fn merged_env(
    base: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut env = base.clone();
    env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Whether `env` disables the daemon (`NO_BUCKD=1` or `true`).
pub fn is_daemon_disabled(env: &BTreeMap<String, String>) -> bool {
    env.get(NO_DAEMON_ENV_VAR)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true"))
        .unwrap_or(false)
}
