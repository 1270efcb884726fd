// src/errors.rs

//! Crate-wide error type.
//!
//! Each variant maps to one failure class of the driver. Callers that only
//! want a message can rely on `Display`; callers that recover from specific
//! failures (e.g. the build path downgrading `CommandFailed`) match on the
//! variant.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuckError {
    /// The engine executable could not be launched at all.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but exited with a non-zero status.
    #[error("buck {} exited with code {exit_code:?}: {stderr}", args.join(" "))]
    CommandFailed {
        args: Vec<String>,
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    #[error("invalid build report: {source}\n{raw}")]
    ReportParse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid query output: {source}\n{raw}")]
    QueryParse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no .buckconfig found in {0} or any of its ancestors")]
    ConfigNotFound(PathBuf),

    #[error("'{target}' resolved to {} targets: {resolved:?}", resolved.len())]
    AmbiguousOrMissingTarget {
        target: String,
        resolved: Vec<String>,
    },

    #[error("buck {} timed out after {after:?}", args.join(" "))]
    Timeout { args: Vec<String>, after: Duration },

    #[error("event stream error: {0}")]
    EventStream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuckError {
    /// True for a non-zero engine exit (as opposed to launch/parse failures).
    pub fn is_command_failure(&self) -> bool {
        matches!(self, BuckError::CommandFailed { .. })
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuckError>;
